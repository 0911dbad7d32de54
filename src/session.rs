//! Conversation lifecycle: which conversation is on screen, what its
//! transcript looks like, and how backend replies are folded back in.
//!
//! The session never talks to the network itself. User actions return
//! [`PendingRequest`]s; whoever runs them hands the [`Reply`] back through
//! [`ChatSession::complete`], which may queue follow-up requests (the
//! conversation list is refetched after every mutation).

use crate::api::{ChatClient, Reply, Request, StartedConversation};
use crate::cache::ConversationCache;
use crate::error::ClientError;
use crate::guard::{Freshness, RequestTarget, RequestToken, RequestTracker};
use crate::models::{ConversationSummary, Message};
use crate::quiz::{QuizContent, QuizError, QuizSelection};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

/// A backend call the session wants made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub token: RequestToken,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// Welcome screen, or a first message waiting for its conversation id.
    NoConversation,
    Active {
        conversation_id: String,
        sending: bool,
    },
}

#[derive(Debug, Default)]
pub struct ChatSession {
    current: Option<String>,
    messages: Vec<Message>,
    cache: ConversationCache,
    conversations: Vec<ConversationSummary>,
    error: Option<String>,
    tracker: RequestTracker,
    /// Optimistic first message of each in-flight start, by token serial.
    outgoing: HashMap<u64, Message>,
    /// Answer picks for quiz messages in the current view, by message index.
    quiz_selections: HashMap<usize, QuizSelection>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_conversation(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn cache(&self) -> &ConversationCache {
        &self.cache
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn state(&self) -> LifecycleState {
        match &self.current {
            None => LifecycleState::NoConversation,
            Some(id) => LifecycleState::Active {
                conversation_id: id.clone(),
                sending: self.is_loading(),
            },
        }
    }

    /// Nothing to show yet: no conversation and no pending first message.
    pub fn is_welcome(&self) -> bool {
        self.current.is_none() && self.messages.is_empty()
    }

    /// Whether a request for the conversation on screen is in flight.
    pub fn is_loading(&self) -> bool {
        self.tracker.is_pending(&self.view_target())
    }

    fn view_target(&self) -> RequestTarget {
        match &self.current {
            None => RequestTarget::NewConversation,
            Some(id) => RequestTarget::Conversation(id.clone()),
        }
    }

    fn issue(&mut self, target: RequestTarget, request: Request) -> PendingRequest {
        let token = self.tracker.issue(target);
        debug!(serial = token.serial(), ?request, "request issued");
        PendingRequest { token, request }
    }

    pub fn refresh_conversations(&mut self) -> PendingRequest {
        self.issue(RequestTarget::ConversationList, Request::List)
    }

    /// Open a new conversation with its first message.
    pub fn start_conversation(&mut self, text: &str) -> Option<PendingRequest> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.current.is_some() {
            self.new_conversation();
        }
        if self.is_loading() {
            debug!("start ignored, a first message is already pending");
            return None;
        }

        self.error = None;
        let message = Message::user(text);
        self.messages = vec![message.clone()];

        let pending = self.issue(
            RequestTarget::NewConversation,
            Request::Start {
                text: text.to_string(),
            },
        );
        self.outgoing.insert(pending.token.serial(), message);
        info!("starting conversation");
        Some(pending)
    }

    /// Send from the composer. Starts a conversation when none is open.
    pub fn send_message(&mut self, text: &str) -> Option<PendingRequest> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let Some(conversation_id) = self.current.clone() else {
            return self.start_conversation(text);
        };
        if self.is_loading() {
            debug!(%conversation_id, "send ignored while a reply is pending");
            return None;
        }

        self.error = None;
        Some(self.dispatch_send(conversation_id, text.to_string()))
    }

    /// Append the outgoing message and queue it. The cache gets the
    /// optimistic transcript so switching away and back shows it.
    fn dispatch_send(&mut self, conversation_id: String, text: String) -> PendingRequest {
        self.messages.push(Message::user(text.clone()));
        self.cache.set(conversation_id.clone(), self.messages.clone());
        info!(%conversation_id, "sending message");
        self.issue(
            RequestTarget::Conversation(conversation_id.clone()),
            Request::Send {
                conversation_id,
                text,
            },
        )
    }

    /// Switch the view to another conversation, loading it on a cache miss.
    pub fn select_conversation(&mut self, conversation_id: &str) -> Option<PendingRequest> {
        self.current = Some(conversation_id.to_string());
        self.quiz_selections.clear();

        if let Some(cached) = self.cache.get(conversation_id) {
            debug!(conversation_id, "conversation served from cache");
            self.messages = cached.to_vec();
            return None;
        }

        self.messages.clear();
        let target = RequestTarget::Conversation(conversation_id.to_string());
        if self.tracker.is_pending(&target) {
            return None;
        }
        Some(self.issue(
            target,
            Request::Load {
                conversation_id: conversation_id.to_string(),
            },
        ))
    }

    /// Back to the welcome screen. A first message still in flight will no
    /// longer take over the view when it resolves.
    pub fn new_conversation(&mut self) {
        self.current = None;
        self.messages.clear();
        self.quiz_selections.clear();
        self.tracker.retire(&RequestTarget::NewConversation);
    }

    pub fn delete_conversation(&mut self, conversation_id: &str) -> PendingRequest {
        info!(conversation_id, "deleting conversation");
        self.issue(
            RequestTarget::Deletion(conversation_id.to_string()),
            Request::Delete {
                conversation_id: conversation_id.to_string(),
            },
        )
    }

    /// Parsed quiz for the message at `index` in the current view.
    pub fn quiz_at(&self, index: usize) -> Result<QuizContent, QuizError> {
        let message = self
            .messages
            .get(index)
            .filter(|message| message.is_quiz())
            .ok_or(QuizError::NotAQuiz(index))?;
        QuizContent::parse(&message.content).ok_or(QuizError::Unstructured)
    }

    /// Index of the newest quiz that can still be answered.
    pub fn open_quiz(&self) -> Option<usize> {
        self.messages
            .iter()
            .enumerate()
            .rev()
            .find(|(_, message)| {
                message.is_quiz()
                    && !message.is_submitted
                    && QuizContent::parse(&message.content).is_some()
            })
            .map(|(index, _)| index)
    }

    pub fn quiz_selection(&self, index: usize) -> Option<&QuizSelection> {
        self.quiz_selections.get(&index)
    }

    /// Pick an answer. Zero-based question and option indices.
    pub fn select_quiz_answer(
        &mut self,
        message_index: usize,
        question: usize,
        option: usize,
    ) -> Result<(), QuizError> {
        let quiz = self.quiz_at(message_index)?;
        if self.messages[message_index].is_submitted {
            return Err(QuizError::AlreadySubmitted);
        }
        self.quiz_selections
            .entry(message_index)
            .or_default()
            .select(&quiz, question, option)
    }

    /// Send the picked answers as a normal message and lock the quiz.
    pub fn submit_quiz(&mut self, message_index: usize) -> Result<PendingRequest, QuizError> {
        let conversation_id = self.current.clone().ok_or(QuizError::NoConversation)?;
        if self.is_loading() {
            return Err(QuizError::Busy);
        }
        let quiz = self.quiz_at(message_index)?;
        if self.messages[message_index].is_submitted {
            return Err(QuizError::AlreadySubmitted);
        }

        let selection = self
            .quiz_selections
            .get(&message_index)
            .cloned()
            .unwrap_or_default();
        let missing = selection.missing(&quiz);
        if !missing.is_empty() {
            return Err(QuizError::Incomplete(missing));
        }

        self.messages[message_index].mark_submitted();
        self.error = None;
        info!(%conversation_id, message_index, "submitting quiz answers");
        Ok(self.dispatch_send(conversation_id, selection.to_reply()))
    }

    /// Fold a finished request back in. Returns follow-up requests.
    pub fn complete(&mut self, token: RequestToken, reply: Reply) -> Vec<PendingRequest> {
        let freshness = self.tracker.complete(&token);
        let target = token.target().clone();
        debug!(serial = token.serial(), ?freshness, ?target, "request completed");

        match (target, reply) {
            (RequestTarget::NewConversation, Reply::Started(result)) => {
                let first = self.outgoing.remove(&token.serial());
                self.finish_start(freshness, first, result)
            }
            (RequestTarget::Conversation(id), Reply::Sent(result)) => {
                self.finish_send(freshness, id, result)
            }
            (RequestTarget::Conversation(id), Reply::Loaded(messages)) => {
                self.finish_load(freshness, id, messages);
                Vec::new()
            }
            (RequestTarget::ConversationList, Reply::Listed(conversations)) => {
                if freshness == Freshness::Latest {
                    self.conversations = conversations;
                }
                Vec::new()
            }
            (RequestTarget::Deletion(id), Reply::Deleted(result)) => self.finish_delete(id, result),
            (target, reply) => {
                warn!(?target, ?reply, "reply does not match its request target");
                Vec::new()
            }
        }
    }

    fn finish_start(
        &mut self,
        freshness: Freshness,
        first: Option<Message>,
        result: Result<StartedConversation, ClientError>,
    ) -> Vec<PendingRequest> {
        let visible = freshness == Freshness::Latest && self.current.is_none();
        match result {
            Ok(started) => {
                let mut transcript: Vec<Message> = first.into_iter().collect();
                transcript.extend(started.messages);
                self.cache.set(started.conversation_id.clone(), transcript.clone());

                if visible {
                    info!(conversation_id = %started.conversation_id, "conversation active");
                    self.current = Some(started.conversation_id);
                    self.messages = transcript;
                } else {
                    info!(
                        conversation_id = %started.conversation_id,
                        "conversation started after navigating away; cached only"
                    );
                }
                vec![self.refresh_conversations()]
            }
            Err(err) => {
                if visible {
                    self.error = Some(err.user_message());
                } else {
                    warn!(error = %err, "stale start failure dropped");
                }
                Vec::new()
            }
        }
    }

    fn finish_send(
        &mut self,
        freshness: Freshness,
        conversation_id: String,
        result: Result<Vec<Message>, ClientError>,
    ) -> Vec<PendingRequest> {
        if freshness == Freshness::Retired {
            debug!(%conversation_id, "reply for a deleted conversation dropped");
            return Vec::new();
        }
        let visible =
            freshness == Freshness::Latest && self.current.as_deref() == Some(conversation_id.as_str());

        match result {
            Ok(replies) => {
                let mut transcript = self
                    .cache
                    .get(&conversation_id)
                    .map(<[Message]>::to_vec)
                    .unwrap_or_default();
                transcript.extend(replies);
                self.cache.set(conversation_id.clone(), transcript.clone());

                if visible {
                    self.messages = transcript;
                } else {
                    info!(%conversation_id, "stale reply cached; view untouched");
                }
                vec![self.refresh_conversations()]
            }
            Err(err) => {
                if visible {
                    self.error = Some(err.user_message());
                } else {
                    warn!(%conversation_id, error = %err, "stale send failure dropped");
                }
                Vec::new()
            }
        }
    }

    fn finish_load(&mut self, freshness: Freshness, conversation_id: String, messages: Vec<Message>) {
        if freshness != Freshness::Latest {
            debug!(%conversation_id, ?freshness, "outdated load ignored");
            return;
        }
        // An empty transcript is what a failed load looks like; leave the
        // cache alone so reopening the conversation tries again.
        if !messages.is_empty() {
            self.cache.set(conversation_id.clone(), messages.clone());
        }
        if self.current.as_deref() == Some(conversation_id.as_str()) {
            self.messages = messages;
        }
    }

    fn finish_delete(
        &mut self,
        conversation_id: String,
        result: Result<(), ClientError>,
    ) -> Vec<PendingRequest> {
        match result {
            Ok(()) => {
                self.tracker
                    .retire(&RequestTarget::Conversation(conversation_id.clone()));
                self.cache.remove(&conversation_id);
                if self.current.as_deref() == Some(conversation_id.as_str()) {
                    self.new_conversation();
                }
                vec![self.refresh_conversations()]
            }
            Err(err) => {
                self.error = Some(format!(
                    "Failed to delete conversation: {}",
                    err.user_message()
                ));
                Vec::new()
            }
        }
    }

    /// Run requests one after another until nothing is left to do.
    pub async fn settle(
        &mut self,
        client: &ChatClient,
        pending: impl IntoIterator<Item = PendingRequest>,
    ) {
        let mut queue: VecDeque<PendingRequest> = pending.into_iter().collect();
        while let Some(next) = queue.pop_front() {
            let reply = client.execute(&next.request).await;
            queue.extend(self.complete(next.token, reply));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{StubBackend, rows, summary};
    use crate::api::RetryPolicy;
    use crate::models::AgentSource;
    use std::sync::Arc;

    const CAPITALS_QUIZ: &str = r#"{
        "header": "Quick check",
        "quiz": [
            {"question": "Capital of France?", "options": ["Berlin", "Paris"]},
            {"question": "2 + 2?", "options": ["3", "4"]}
        ],
        "footer": ""
    }"#;

    fn setup() -> (Arc<StubBackend>, ChatClient, ChatSession) {
        let backend = Arc::new(StubBackend::new());
        let client = ChatClient::new(backend.clone(), RetryPolicy::default());
        (backend, client, ChatSession::new())
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|message| message.content.as_str()).collect()
    }

    async fn open(session: &mut ChatSession, client: &ChatClient, id: &str) {
        let pending = session.select_conversation(id);
        session.settle(client, pending).await;
    }

    #[tokio::test]
    async fn start_then_send_extends_transcript_in_order() {
        let (backend, client, mut session) = setup();
        backend.push_start("c1", &[("course_outline_agent", "Outline")]);
        backend.set_summaries(vec![summary("c1", "Rust basics")]);

        assert!(session.is_welcome());
        let pending = session.send_message("teach me rust");
        assert_eq!(contents(session.messages()), vec!["teach me rust"]);
        assert!(session.is_loading());
        session.settle(&client, pending).await;

        assert_eq!(session.current_conversation(), Some("c1"));
        assert_eq!(session.conversations().len(), 1);
        let before = session.messages().to_vec();

        backend.push_send(Ok(rows(&[("topic_explainer", "Ownership"), ("topic_explainer", "Borrowing")])));
        let pending = session.send_message("go on");
        session.settle(&client, pending).await;

        let mut expected = contents(&before);
        expected.extend(["go on", "Ownership", "Borrowing"]);
        assert_eq!(contents(session.messages()), expected);
        assert_eq!(session.messages()[before.len()].source, AgentSource::User);
        assert_eq!(session.cache().get("c1").unwrap(), session.messages());
        assert_eq!(backend.count("fetch_conversations"), 2);
        assert!(!session.is_loading());
        assert_eq!(
            session.state(),
            LifecycleState::Active {
                conversation_id: "c1".to_string(),
                sending: false
            }
        );
    }

    #[tokio::test]
    async fn stale_reply_leaves_other_view_alone() {
        let (backend, client, mut session) = setup();
        backend.set_transcript("a", &[("user", "a1"), ("topic_explainer", "a2")]);
        backend.set_transcript("b", &[("user", "b1")]);
        open(&mut session, &client, "b").await;
        open(&mut session, &client, "a").await;

        backend.push_send(Ok(rows(&[("topic_explainer", "late answer")])));
        let pending = session.send_message("question for a").unwrap();
        assert!(session.is_loading());

        assert!(session.select_conversation("b").is_none());
        assert!(!session.is_loading());

        let reply = client.execute(&pending.request).await;
        session.complete(pending.token, reply);

        assert_eq!(session.current_conversation(), Some("b"));
        assert_eq!(contents(session.messages()), vec!["b1"]);
        assert!(!session.is_loading());

        // The exchange is kept for when the user goes back.
        assert!(session.select_conversation("a").is_none());
        assert_eq!(
            contents(session.messages()),
            vec!["a1", "a2", "question for a", "late answer"]
        );
    }

    #[tokio::test]
    async fn stale_failure_does_not_raise_banner() {
        let (backend, client, mut session) = setup();
        backend.set_transcript("a", &[("user", "a1")]);
        backend.set_transcript("b", &[("user", "b1")]);
        open(&mut session, &client, "a").await;
        open(&mut session, &client, "b").await;
        session.select_conversation("a");

        backend.push_send(Err(ClientError::server("send_message", 500, "boom")));
        let pending = session.send_message("hi").unwrap();
        session.select_conversation("b");
        let reply = client.execute(&pending.request).await;
        session.complete(pending.token, reply);

        assert_eq!(session.error(), None);
    }

    #[tokio::test]
    async fn reselecting_loaded_conversation_uses_cache() {
        let (backend, client, mut session) = setup();
        backend.set_transcript("c1", &[("user", "one")]);
        backend.set_transcript("c2", &[("user", "two")]);

        open(&mut session, &client, "c1").await;
        open(&mut session, &client, "c2").await;
        assert!(session.select_conversation("c1").is_none());

        assert_eq!(backend.count("load_conversation"), 2);
        assert_eq!(contents(session.messages()), vec!["one"]);
    }

    #[tokio::test]
    async fn failed_load_is_retried_on_next_visit() {
        let (backend, client, mut session) = setup();
        open(&mut session, &client, "ghost").await;
        assert!(session.messages().is_empty());
        assert!(!session.cache().contains("ghost"));
        assert_eq!(backend.count("load_conversation"), 1);

        backend.set_transcript("ghost", &[("user", "back again")]);
        open(&mut session, &client, "ghost").await;
        assert_eq!(backend.count("load_conversation"), 2);
        assert_eq!(contents(session.messages()), vec!["back again"]);
    }

    #[tokio::test]
    async fn markdown_quiz_can_be_answered() {
        let (backend, client, mut session) = setup();
        backend.set_transcript(
            "c1",
            &[
                ("user", "quiz me"),
                (
                    "quiz_agent",
                    "1. What is the capital of France?\n   a) Berlin\n   b) Paris\n   c) Rome",
                ),
            ],
        );
        open(&mut session, &client, "c1").await;

        let quiz = session.open_quiz().expect("markdown quiz is selectable");
        session.select_quiz_answer(quiz, 0, 1).unwrap();
        let pending = session.submit_quiz(quiz).unwrap();
        assert_eq!(
            pending.request,
            Request::Send {
                conversation_id: "c1".to_string(),
                text: "1. Paris".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn quiz_answers_are_sent_in_question_order() {
        let (backend, client, mut session) = setup();
        backend.set_transcript("c1", &[("user", "quiz me"), ("quiz_agent", CAPITALS_QUIZ)]);
        open(&mut session, &client, "c1").await;

        let quiz = session.open_quiz().unwrap();
        assert_eq!(quiz, 1);
        session.select_quiz_answer(quiz, 1, 1).unwrap();
        assert_eq!(session.submit_quiz(quiz), Err(QuizError::Incomplete(vec![0])));
        session.select_quiz_answer(quiz, 0, 1).unwrap();

        let pending = session.submit_quiz(quiz).unwrap();
        assert_eq!(
            pending.request,
            Request::Send {
                conversation_id: "c1".to_string(),
                text: "1. Paris, 2. 4".to_string(),
            }
        );
        assert!(session.messages()[quiz].is_submitted);
        assert_eq!(session.messages().last().unwrap().content, "1. Paris, 2. 4");
        assert_eq!(session.open_quiz(), None);

        backend.push_send(Ok(rows(&[("topic_explainer", "Both correct!")])));
        session.settle(&client, [pending]).await;

        assert_eq!(session.select_quiz_answer(quiz, 0, 0), Err(QuizError::AlreadySubmitted));
        assert_eq!(session.submit_quiz(quiz), Err(QuizError::AlreadySubmitted));
        assert!(session.cache().get("c1").unwrap()[quiz].is_submitted);
    }

    #[tokio::test]
    async fn quiz_actions_reject_non_quiz_messages() {
        let (backend, client, mut session) = setup();
        backend.set_transcript("c1", &[("user", "hi"), ("quiz_agent", "What is 2 + 2?")]);
        open(&mut session, &client, "c1").await;

        assert_eq!(session.select_quiz_answer(0, 0, 0), Err(QuizError::NotAQuiz(0)));
        assert_eq!(session.select_quiz_answer(1, 0, 0), Err(QuizError::Unstructured));
        assert_eq!(session.open_quiz(), None);
    }

    #[tokio::test]
    async fn deleting_current_conversation_returns_to_welcome() {
        let (backend, client, mut session) = setup();
        backend.set_transcript("c1", &[("user", "one")]);
        backend.set_transcript("c2", &[("user", "two")]);
        backend.set_summaries(vec![summary("c1", "One"), summary("c2", "Two")]);
        let initial = session.refresh_conversations();
        session.settle(&client, [initial]).await;
        open(&mut session, &client, "c1").await;

        let pending = session.delete_conversation("c1");
        session.settle(&client, [pending]).await;

        assert_eq!(session.state(), LifecycleState::NoConversation);
        assert!(session.is_welcome());
        assert!(!session.cache().contains("c1"));
        let ids: Vec<&str> = session.conversations().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c2"]);
    }

    #[tokio::test]
    async fn deleting_other_conversation_keeps_view() {
        let (backend, client, mut session) = setup();
        backend.set_transcript("c1", &[("user", "one")]);
        backend.set_transcript("c2", &[("user", "two")]);
        open(&mut session, &client, "c2").await;
        open(&mut session, &client, "c1").await;

        let pending = session.delete_conversation("c2");
        session.settle(&client, [pending]).await;

        assert_eq!(session.current_conversation(), Some("c1"));
        assert_eq!(contents(session.messages()), vec!["one"]);
        assert!(!session.cache().contains("c2"));
    }

    #[tokio::test]
    async fn delete_failure_raises_banner() {
        let (backend, client, mut session) = setup();
        backend.fail_deletes();

        let pending = session.delete_conversation("c1");
        session.settle(&client, [pending]).await;

        assert_eq!(
            session.error(),
            Some("Failed to delete conversation: Server responded with status: 500")
        );
    }

    #[tokio::test]
    async fn error_clears_only_on_next_attempt() {
        let (backend, client, mut session) = setup();
        let pending = session.start_conversation("hello");
        session.settle(&client, pending).await;

        assert_eq!(session.error(), Some("Server responded with status: 500"));
        assert_eq!(contents(session.messages()), vec!["hello"]);
        assert!(!session.is_welcome());

        session.new_conversation();
        assert!(session.error().is_some());

        backend.push_start("c1", &[("course_outline_agent", "Outline")]);
        let pending = session.start_conversation("hello again");
        assert_eq!(session.error(), None);
        session.settle(&client, pending).await;
        assert_eq!(session.current_conversation(), Some("c1"));
    }

    #[tokio::test]
    async fn abandoned_start_is_cached_but_not_shown() {
        let (backend, client, mut session) = setup();
        backend.push_start("c1", &[("course_outline_agent", "Outline")]);
        backend.set_summaries(vec![summary("c1", "Rust")]);

        let pending = session.start_conversation("teach me rust").unwrap();
        session.new_conversation();
        assert!(!session.is_loading());

        let reply = client.execute(&pending.request).await;
        let follow_ups = session.complete(pending.token, reply);
        session.settle(&client, follow_ups).await;

        assert!(session.is_welcome());
        assert_eq!(contents(session.cache().get("c1").unwrap()), vec!["teach me rust", "Outline"]);
        assert_eq!(session.conversations().len(), 1);
    }

    #[tokio::test]
    async fn input_is_ignored_while_reply_pending() {
        let (backend, client, mut session) = setup();
        backend.set_transcript("c1", &[("user", "one")]);
        open(&mut session, &client, "c1").await;

        assert!(session.send_message("first").is_some());
        assert!(session.send_message("second").is_none());
        assert!(session.send_message("   ").is_none());
        assert_eq!(contents(session.messages()), vec!["one", "first"]);
    }

    #[tokio::test]
    async fn reply_for_deleted_conversation_is_dropped() {
        let (backend, client, mut session) = setup();
        backend.set_transcript("c1", &[("user", "one")]);
        open(&mut session, &client, "c1").await;

        backend.push_send(Ok(rows(&[("topic_explainer", "late")])));
        let send = session.send_message("hi").unwrap();
        let delete = session.delete_conversation("c1");
        session.settle(&client, [delete]).await;

        let reply = client.execute(&send.request).await;
        assert!(session.complete(send.token, reply).is_empty());
        assert!(!session.cache().contains("c1"));
        assert!(session.is_welcome());
    }
}
