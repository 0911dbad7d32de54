use crate::models::Message;
use std::collections::HashMap;

/// Transcripts already fetched during this session, keyed by conversation id.
///
/// Entries are always replaced wholesale; nothing is persisted.
#[derive(Debug, Default, Clone)]
pub struct ConversationCache {
    transcripts: HashMap<String, Vec<Message>>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, conversation_id: &str) -> Option<&[Message]> {
        self.transcripts.get(conversation_id).map(Vec::as_slice)
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.transcripts.contains_key(conversation_id)
    }

    pub fn set(&mut self, conversation_id: impl Into<String>, messages: Vec<Message>) {
        self.transcripts.insert(conversation_id.into(), messages);
    }

    pub fn remove(&mut self, conversation_id: &str) -> Option<Vec<Message>> {
        self.transcripts.remove(conversation_id)
    }

    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }
}
