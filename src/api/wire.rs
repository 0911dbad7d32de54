//! JSON bodies exchanged with the backend.

use crate::models::{AgentSource, ConversationSummary, Message};
use serde::{Deserialize, Serialize};

/// One `[source, text]` row of a conversation payload.
pub type WireMessage = (String, String);

#[derive(Debug, Serialize)]
pub struct NewMessageRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub struct MessageRequest<'a> {
    pub message: &'a str,
    pub conversation_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ConversationRequest<'a> {
    pub conversation_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct StartConversationResponse {
    pub conversation_id: String,
    #[serde(default)]
    pub conversation: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationResponse {
    #[serde(default)]
    pub conversation: Vec<WireMessage>,
}

/// `fetch_conversations` rows are `[id, title]` or `[id, title, lastUpdated]`.
#[derive(Debug, Deserialize)]
pub struct ConversationListResponse {
    #[serde(default)]
    pub conversations: Vec<Vec<serde_json::Value>>,
}

impl ConversationListResponse {
    pub fn into_summaries(self) -> Vec<ConversationSummary> {
        self.conversations
            .into_iter()
            .filter_map(|row| {
                let mut fields = row.into_iter().map(|value| match value {
                    serde_json::Value::String(text) => Some(text),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                });
                let id = fields.next().flatten().filter(|id| !id.is_empty())?;
                let title = fields.next().flatten().unwrap_or_else(|| "Untitled".to_string());
                let last_updated = fields.next().flatten();
                Some(ConversationSummary {
                    id,
                    title,
                    last_updated,
                })
            })
            .collect()
    }
}

/// Map raw rows to messages stamped with the local clock, since the backend
/// does not send per-message timestamps.
pub fn into_messages(rows: Vec<WireMessage>) -> Vec<Message> {
    rows.into_iter()
        .map(|(source, content)| Message::new(AgentSource::from_wire(&source), content))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_conversation_rows() {
        let response: ConversationResponse = serde_json::from_str(
            r#"{"conversation": [["user", "hi"], ["topic_explainer", "**Hello**"], ["mystery", "?"]]}"#,
        )
        .unwrap();
        let messages = into_messages(response.conversation);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].source, AgentSource::User);
        assert_eq!(messages[1].source, AgentSource::TopicExplainer);
        assert_eq!(messages[1].content, "**Hello**");
        assert_eq!(messages[2].source, AgentSource::Assistant);
        assert!(messages.iter().all(|message| !message.is_submitted));
    }

    #[test]
    fn decodes_summaries_with_and_without_timestamps() {
        let response: ConversationListResponse = serde_json::from_str(
            r#"{"conversations": [
                ["c1", "Intro to OOP"],
                ["c2", "Browsers", "2024-05-01 10:00"],
                ["", "no id"],
                [null, "null id"],
                ["c3", null]
            ]}"#,
        )
        .unwrap();
        let summaries = response.into_summaries();

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].last_updated, None);
        assert_eq!(summaries[1].last_updated.as_deref(), Some("2024-05-01 10:00"));
        assert_eq!(summaries[2].title, "Untitled");
    }

    #[test]
    fn start_response_requires_an_id() {
        assert!(serde_json::from_str::<StartConversationResponse>(r#"{"conversation": []}"#).is_err());
        let response: StartConversationResponse =
            serde_json::from_str(r#"{"conversation_id": "abc", "conversation": [["course_outline_agent", "Outline"]]}"#)
                .unwrap();
        assert_eq!(response.conversation_id, "abc");
    }

    #[test]
    fn request_bodies_use_snake_case_keys() {
        let body = serde_json::to_value(MessageRequest {
            message: "hello",
            conversation_id: "c1",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"message": "hello", "conversation_id": "c1"}));
    }
}
