//! Conversation UI components for the chat view

pub mod commands;
pub mod composer;
pub mod history;
pub mod indicator;

pub use commands::{ParsedCommand, SlashCommand, get_help_text};
pub use composer::{Composer, ComposerResult};
pub use history::TranscriptView;
pub use indicator::LoadingIndicator;
