//! Transport to the teaching assistant backend.
//!
//! [`ChatBackend`] is the raw endpoint surface; [`HttpBackend`] implements it
//! over HTTP. [`ChatClient`] layers the client-side policy on top: mapping
//! rows to [`Message`]s, polling `send_message` until the agents have
//! produced something, and degrading load/list failures to empty results.

pub mod http;
pub mod wire;

pub use http::HttpBackend;

use crate::config::RetryConfig;
use crate::error::{CONNECTION_HINT, ClientError};
use crate::models::{ConversationSummary, Message};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use wire::{StartConversationResponse, WireMessage, into_messages};

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn start_conversation(
        &self,
        message: &str,
    ) -> Result<StartConversationResponse, ClientError>;

    async fn send_message(
        &self,
        message: &str,
        conversation_id: &str,
    ) -> Result<Vec<WireMessage>, ClientError>;

    async fn load_conversation(&self, conversation_id: &str)
    -> Result<Vec<WireMessage>, ClientError>;

    async fn fetch_conversations(&self) -> Result<Vec<ConversationSummary>, ClientError>;

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ClientError>;
}

/// Fixed-interval polling for `send_message`.
///
/// The backend hands work to its agents asynchronously and answers with an
/// empty conversation until they are done, so an empty payload means "ask
/// again", not failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: config.delay(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedConversation {
    pub conversation_id: String,
    pub messages: Vec<Message>,
}

/// A backend call queued by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Start { text: String },
    Send { conversation_id: String, text: String },
    Load { conversation_id: String },
    List,
    Delete { conversation_id: String },
}

/// Outcome of a [`Request`], fed back into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Started(Result<StartedConversation, ClientError>),
    Sent(Result<Vec<Message>, ClientError>),
    Loaded(Vec<Message>),
    Listed(Vec<ConversationSummary>),
    Deleted(Result<(), ClientError>),
}

#[derive(Clone)]
pub struct ChatClient {
    backend: Arc<dyn ChatBackend>,
    retry: RetryPolicy,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn ChatBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Create a conversation from its first message.
    ///
    /// Every call creates a new server-side conversation, so this is never
    /// replayed.
    pub async fn start_conversation(&self, text: &str) -> Result<StartedConversation, ClientError> {
        let response = self.backend.start_conversation(text).await.map_err(|err| {
            warn!(error = %err, "failed to start conversation");
            err
        })?;

        let mut messages = into_messages(response.conversation);
        if messages.is_empty() {
            warn!(conversation_id = %response.conversation_id, "start_conversation returned no replies");
            messages.push(Message::fallback());
        }
        info!(conversation_id = %response.conversation_id, replies = messages.len(), "conversation started");

        Ok(StartedConversation {
            conversation_id: response.conversation_id,
            messages,
        })
    }

    /// Send a message, polling while the backend reports nothing yet.
    pub async fn send_message(
        &self,
        text: &str,
        conversation_id: &str,
    ) -> Result<Vec<Message>, ClientError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let last_attempt = attempt >= max_attempts;
            match self.backend.send_message(text, conversation_id).await {
                Ok(rows) if !rows.is_empty() => {
                    debug!(conversation_id, attempt, replies = rows.len(), "send_message answered");
                    return Ok(into_messages(rows));
                }
                Ok(_) if last_attempt => {
                    warn!(conversation_id, attempt, "no reply after final attempt, using fallback");
                    return Ok(vec![Message::fallback()]);
                }
                Ok(_) => {
                    debug!(conversation_id, attempt, "reply not ready yet");
                }
                Err(err) if err.is_connection() && last_attempt => {
                    warn!(conversation_id, attempt, error = %err, "backend unreachable, giving up");
                    return Err(ClientError::connection(CONNECTION_HINT));
                }
                Err(err) if err.is_connection() => {
                    warn!(conversation_id, attempt, error = %err, "backend unreachable, retrying");
                }
                Err(err) => {
                    warn!(conversation_id, attempt, error = %err, "send_message failed");
                    return Err(err);
                }
            }

            tokio::time::sleep(self.retry.delay).await;
            attempt += 1;
        }
    }

    /// Fetch a transcript. Failures degrade to an empty transcript.
    pub async fn load_conversation(&self, conversation_id: &str) -> Vec<Message> {
        match self.backend.load_conversation(conversation_id).await {
            Ok(rows) => into_messages(rows),
            Err(err) => {
                warn!(conversation_id, error = %err, "failed to load conversation");
                Vec::new()
            }
        }
    }

    /// Fetch sidebar summaries. Failures degrade to an empty list.
    pub async fn list_conversations(&self) -> Vec<ConversationSummary> {
        match self.backend.fetch_conversations().await {
            Ok(summaries) => summaries,
            Err(err) => {
                warn!(error = %err, "failed to fetch conversations");
                Vec::new()
            }
        }
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ClientError> {
        self.backend
            .delete_conversation(conversation_id)
            .await
            .inspect(|_| info!(conversation_id, "conversation deleted"))
            .inspect_err(|err| warn!(conversation_id, error = %err, "failed to delete conversation"))
    }

    pub async fn execute(&self, request: &Request) -> Reply {
        match request {
            Request::Start { text } => Reply::Started(self.start_conversation(text).await),
            Request::Send {
                conversation_id,
                text,
            } => Reply::Sent(self.send_message(text, conversation_id).await),
            Request::Load { conversation_id } => {
                Reply::Loaded(self.load_conversation(conversation_id).await)
            }
            Request::List => Reply::Listed(self.list_conversations().await),
            Request::Delete { conversation_id } => {
                Reply::Deleted(self.delete_conversation(conversation_id).await)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{StubBackend, rows, summary};
    use super::*;
    use crate::models::AgentSource;

    fn client(backend: &Arc<StubBackend>) -> ChatClient {
        ChatClient::new(backend.clone(), RetryPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_reply_is_ready() {
        let backend = Arc::new(StubBackend::new());
        for _ in 0..4 {
            backend.push_send(Ok(Vec::new()));
        }
        backend.push_send(Ok(rows(&[("topic_explainer", "Classes bundle data and behavior.")])));

        let started = tokio::time::Instant::now();
        let replies = client(&backend).send_message("what is oop", "c1").await.unwrap();

        assert_eq!(backend.count("send_message"), 5);
        assert!(started.elapsed() >= Duration::from_secs(4));
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].source, AgentSource::TopicExplainer);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_polling_yields_one_fallback_message() {
        let backend = Arc::new(StubBackend::new());
        for _ in 0..5 {
            backend.push_send(Ok(Vec::new()));
        }

        let replies = client(&backend).send_message("hello", "c1").await.unwrap();

        assert_eq!(backend.count("send_message"), 5);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].source, AgentSource::DEFAULT_AGENT);
        assert_eq!(replies[0].content, Message::fallback().content);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_backend_is_retried_then_reported() {
        let backend = Arc::new(StubBackend::new());
        for _ in 0..5 {
            backend.push_send(Err(ClientError::connection("connection refused")));
        }

        let err = client(&backend).send_message("hello", "c1").await.unwrap_err();

        assert_eq!(backend.count("send_message"), 5);
        assert_eq!(err, ClientError::connection(CONNECTION_HINT));
        assert_eq!(err.user_message(), CONNECTION_HINT);
    }

    #[tokio::test(start_paused = true)]
    async fn connection_blip_recovers() {
        let backend = Arc::new(StubBackend::new());
        backend.push_send(Err(ClientError::connection("reset")));
        backend.push_send(Ok(rows(&[("quiz_agent", "{}")])));

        let replies = client(&backend).send_message("ready", "c1").await.unwrap();
        assert_eq!(backend.count("send_message"), 2);
        assert_eq!(replies[0].source, AgentSource::Quiz);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_send_is_not_replayed() {
        let backend = Arc::new(StubBackend::new());
        backend.push_send(Err(ClientError::timeout("send_message", "operation timed out")));
        backend.push_send(Ok(rows(&[("quiz_agent", "never reached")])));

        let err = client(&backend).send_message("my answer", "c1").await.unwrap_err();

        assert_eq!(backend.count("send_message"), 1);
        assert_eq!(err.user_message(), crate::error::TIMEOUT_HINT);
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_are_not_retried() {
        let backend = Arc::new(StubBackend::new());
        backend.push_send(Err(ClientError::server("send_message", 500, "agent crashed")));
        backend.push_send(Ok(rows(&[("user", "never reached")])));

        let err = client(&backend).send_message("hello", "c1").await.unwrap_err();

        assert_eq!(backend.count("send_message"), 1);
        assert!(matches!(err, ClientError::Server { status: 500, .. }));
    }

    #[tokio::test]
    async fn start_maps_replies_and_id() {
        let backend = Arc::new(StubBackend::new());
        backend.push_start("c9", &[("course_outline_agent", "# Outline")]);

        let started = client(&backend).start_conversation("teach me rust").await.unwrap();
        assert_eq!(started.conversation_id, "c9");
        assert_eq!(started.messages[0].source, AgentSource::CourseOutline);
    }

    #[tokio::test]
    async fn start_with_no_replies_uses_fallback() {
        let backend = Arc::new(StubBackend::new());
        backend.push_start("c9", &[]);

        let started = client(&backend).start_conversation("hi").await.unwrap();
        assert_eq!(started.messages.len(), 1);
        assert_eq!(started.messages[0].content, Message::fallback().content);
        assert_eq!(backend.count("start_conversation"), 1);
    }

    #[tokio::test]
    async fn load_and_list_failures_degrade_to_empty() {
        let backend = Arc::new(StubBackend::new());
        backend.fail_lists();

        let client = client(&backend);
        assert!(client.load_conversation("missing").await.is_empty());
        assert!(client.list_conversations().await.is_empty());
    }

    #[tokio::test]
    async fn delete_failures_propagate() {
        let backend = Arc::new(StubBackend::new());
        backend.set_summaries(vec![summary("c1", "One")]);
        let client = client(&backend);

        assert!(client.delete_conversation("c1").await.is_ok());
        assert!(client.list_conversations().await.is_empty());

        backend.fail_deletes();
        assert!(client.delete_conversation("c1").await.is_err());
    }

    #[tokio::test]
    async fn execute_dispatches_by_request() {
        let backend = Arc::new(StubBackend::new());
        backend.set_transcript("c1", &[("user", "hi"), ("topic_explainer", "hello")]);
        let client = client(&backend);

        let reply = client
            .execute(&Request::Load {
                conversation_id: "c1".to_string(),
            })
            .await;
        match reply {
            Reply::Loaded(messages) => assert_eq!(messages.len(), 2),
            other => panic!("unexpected reply: {other:?}"),
        }
        assert_eq!(backend.calls(), vec!["load_conversation".to_string()]);
    }
}
