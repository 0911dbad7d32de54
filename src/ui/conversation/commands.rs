use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Go back to the welcome screen
    New,
    /// Open a conversation from the sidebar by number
    Open,
    /// Delete a conversation by number (current one if omitted)
    Delete,
    /// Ask one of the suggested topics
    Topic,
    /// Pick an answer in the open quiz
    Answer,
    /// Send the open quiz's answers
    Submit,
    /// Refetch the conversation list
    Refresh,
    /// Show or hide the sidebar
    Sidebar,
    /// Show help
    Help,
    /// Exit the application
    Bye,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// First argument as a one-based list position, converted to zero-based.
    pub fn position(&self) -> Option<usize> {
        let first = self.argument()?.split_whitespace().next()?;
        parse_position(first)
    }

    /// `/answer <question> <option>`; the option may be a number or a letter.
    /// Returns zero-based indices.
    pub fn answer_target(&self) -> Option<(usize, usize)> {
        if self.command != SlashCommand::Answer {
            return None;
        }
        let mut parts = self.argument()?.split_whitespace();
        let question = parse_position(parts.next()?)?;
        let option = parts.next()?;
        let option = parse_position(option).or_else(|| parse_letter(option))?;
        Some((question, option))
    }
}

fn parse_position(text: &str) -> Option<usize> {
    text.trim_end_matches('.')
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
}

fn parse_letter(text: &str) -> Option<usize> {
    let mut chars = text.trim_end_matches([')', '.']).chars();
    let letter = chars.next()?.to_ascii_lowercase();
    if chars.next().is_some() || !letter.is_ascii_lowercase() {
        return None;
    }
    Some((letter as u8 - b'a') as usize)
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "start a new conversation",
            SlashCommand::Open => "open conversation <n> from the sidebar",
            SlashCommand::Delete => "delete conversation <n> (or the open one)",
            SlashCommand::Topic => "ask suggested topic <n>",
            SlashCommand::Answer => "answer quiz question <q> with option <n|letter>",
            SlashCommand::Submit => "submit the quiz answers",
            SlashCommand::Refresh => "reload the conversation list",
            SlashCommand::Sidebar => "show or hide the sidebar",
            SlashCommand::Help => "show available commands",
            SlashCommand::Bye => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }

    /// Whether this command can be run while a reply is pending.
    pub fn available_while_loading(self) -> bool {
        !matches!(self, SlashCommand::Topic | SlashCommand::Submit)
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let rest: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(head).ok().or_else(|| match head.to_lowercase().as_str() {
        "q" | "quit" | "exit" => Some(SlashCommand::Bye),
        "n" | "clear" => Some(SlashCommand::New),
        "o" | "load" => Some(SlashCommand::Open),
        "rm" | "del" => Some(SlashCommand::Delete),
        "a" => Some(SlashCommand::Answer),
        "h" | "?" => Some(SlashCommand::Help),
        _ => None,
    })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for entry in command_entries() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }

    help.push_str("\nKeys: Ctrl+N new chat, Ctrl+B toggle sidebar, Ctrl+Up/Down pick a conversation,");
    help.push_str("\nCtrl+O open it, Ctrl+D delete it, PageUp/PageDown scroll, Ctrl+C quit.");

    help
}
