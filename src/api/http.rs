use crate::api::ChatBackend;
use crate::api::wire::{
    ConversationListResponse, ConversationRequest, ConversationResponse, MessageRequest,
    NewMessageRequest, StartConversationResponse, WireMessage,
};
use crate::config::Config;
use crate::error::ClientError;
use crate::models::ConversationSummary;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

/// [`ChatBackend`] over the backend's JSON/HTTP API.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| ClientError::Http(format!("Failed to create HTTP client: {err}")))?;

        Ok(Self {
            base_url: config.backend_base().to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Send a request and decode the JSON body, mapping non-success statuses
    /// to [`ClientError::Server`].
    async fn exchange<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.checked(endpoint, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| ClientError::decode(endpoint, err.to_string()))
    }

    async fn checked(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        debug!(endpoint, "backend request");
        let response = request
            .send()
            .await
            .map_err(|err| ClientError::from_reqwest(endpoint, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::server(endpoint, status.as_u16(), body));
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn start_conversation(
        &self,
        message: &str,
    ) -> Result<StartConversationResponse, ClientError> {
        let request = self
            .client
            .post(self.url("start_conversation"))
            .json(&NewMessageRequest { message });
        self.exchange("start_conversation", request).await
    }

    async fn send_message(
        &self,
        message: &str,
        conversation_id: &str,
    ) -> Result<Vec<WireMessage>, ClientError> {
        let request = self.client.post(self.url("send_message")).json(&MessageRequest {
            message,
            conversation_id,
        });
        let response: ConversationResponse = self.exchange("send_message", request).await?;
        Ok(response.conversation)
    }

    async fn load_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<WireMessage>, ClientError> {
        let request = self
            .client
            .post(self.url("load_conversation"))
            .json(&ConversationRequest { conversation_id });
        let response: ConversationResponse = self.exchange("load_conversation", request).await?;
        Ok(response.conversation)
    }

    async fn fetch_conversations(&self) -> Result<Vec<ConversationSummary>, ClientError> {
        let request = self.client.get(self.url("fetch_conversations"));
        let response: ConversationListResponse =
            self.exchange("fetch_conversations", request).await?;
        Ok(response.into_summaries())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ClientError> {
        let request = self
            .client
            .delete(self.url("delete_conversation"))
            .json(&ConversationRequest { conversation_id });
        self.checked("delete_conversation", request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let mut config = Config::default();
        config.backend_url = "http://localhost:8000/".to_string();
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.url("send_message"), "http://localhost:8000/send_message");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_connection_error() {
        // Port 9 (discard) is closed on test machines; the connect is refused.
        let mut config = Config::default();
        config.backend_url = "http://127.0.0.1:9".to_string();
        config.request_timeout_secs = 5;
        let backend = HttpBackend::new(&config).unwrap();

        let err = backend.fetch_conversations().await.unwrap_err();
        assert!(err.is_connection(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn silent_backend_times_out_after_one_post() {
        use crate::api::{ChatClient, RetryPolicy};
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                open.push(socket);
            }
        });

        let mut config = Config::default();
        config.backend_url = format!("http://{address}");
        config.request_timeout_secs = 1;
        let backend = HttpBackend::new(&config).unwrap();
        let client = ChatClient::new(
            Arc::new(backend),
            RetryPolicy {
                max_attempts: 5,
                delay: Duration::from_millis(10),
            },
        );

        let err = client.send_message("my answer", "c1").await.unwrap_err();

        assert!(matches!(err, ClientError::Timeout { .. }), "unexpected error: {err:?}");
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }
}
