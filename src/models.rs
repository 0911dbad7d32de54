use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

/// Producer of a message in a conversation.
///
/// The backend runs a fixed team of agents, so the set is closed. Any source
/// name the client does not know falls back to [`AgentSource::Assistant`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
pub enum AgentSource {
    #[strum(serialize = "user")]
    #[serde(rename = "user")]
    User,
    #[strum(serialize = "course_outline_agent")]
    #[serde(rename = "course_outline_agent")]
    CourseOutline,
    #[strum(serialize = "quiz_agent")]
    #[serde(rename = "quiz_agent")]
    Quiz,
    #[strum(serialize = "topic_explainer")]
    #[serde(rename = "topic_explainer")]
    TopicExplainer,
    #[strum(serialize = "assistant")]
    #[serde(rename = "assistant")]
    Assistant,
}

impl AgentSource {
    /// Source the client attributes its own synthetic replies to.
    pub const DEFAULT_AGENT: AgentSource = AgentSource::CourseOutline;

    /// Parse a wire source name, mapping unknown producers to the default styling.
    pub fn from_wire(name: &str) -> Self {
        AgentSource::from_str(name.trim()).unwrap_or(AgentSource::Assistant)
    }

    pub fn wire_name(self) -> &'static str {
        self.into()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AgentSource::User => "You",
            AgentSource::CourseOutline => "Course Outline",
            AgentSource::Quiz => "Quiz",
            AgentSource::TopicExplainer => "Topic Explainer",
            AgentSource::Assistant => "Assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == AgentSource::User
    }
}

/// A single entry of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub source: AgentSource,
    /// Markdown text as produced by the backend.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Only meaningful for quiz messages; flips to true once answers are sent.
    #[serde(default)]
    pub is_submitted: bool,
}

impl Message {
    pub fn new(source: AgentSource, content: impl Into<String>) -> Self {
        Self {
            source,
            content: content.into(),
            timestamp: Utc::now(),
            is_submitted: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(AgentSource::User, content)
    }

    /// Reply used when the backend never produced anything for a request.
    pub fn fallback() -> Self {
        Self::new(
            AgentSource::DEFAULT_AGENT,
            "I apologize, but I'm having trouble processing your request at the moment. \
             Please try again or rephrase your question.",
        )
    }

    pub fn is_quiz(&self) -> bool {
        self.source == AgentSource::Quiz
    }

    /// Mark a quiz message as answered. Returns false if it already was.
    pub fn mark_submitted(&mut self) -> bool {
        if self.is_submitted {
            return false;
        }
        self.is_submitted = true;
        true
    }
}

/// Sidebar entry for a server-side conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub last_updated: Option<String>,
}
