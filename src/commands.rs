//! One-shot subcommands: everything the chat screen does, printed to stdout.

use crate::api::ChatClient;
use crate::config::Config;
use crate::models::Message;
use crate::quiz::QuizContent;
use crate::session::ChatSession;
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::Path;

pub async fn list_conversations(client: &ChatClient, out: &mut impl Write) -> Result<()> {
    let conversations = client.list_conversations().await;

    if conversations.is_empty() {
        writeln!(out, "📭 No conversations yet. Run 'lectern ask <question>' to start one!")?;
        return Ok(());
    }

    writeln!(out, "💬 Your conversations:")?;
    writeln!(out, "{}", "=".repeat(50))?;
    for (index, summary) in conversations.iter().enumerate() {
        writeln!(out, "{:>3}. {}", index + 1, summary.title)?;
        writeln!(out, "     🆔 {}", summary.id)?;
        if let Some(updated) = &summary.last_updated {
            writeln!(out, "     🕒 {updated}")?;
        }
    }

    Ok(())
}

pub async fn show_conversation(
    client: &ChatClient,
    conversation_id: &str,
    out: &mut impl Write,
) -> Result<()> {
    let messages = client.load_conversation(conversation_id).await;
    if messages.is_empty() {
        bail!("Conversation '{conversation_id}' not found or empty");
    }
    print_transcript(&messages, out)
}

/// Start a conversation and print the whole exchange.
pub async fn ask(client: &ChatClient, text: &str, out: &mut impl Write) -> Result<()> {
    let mut session = ChatSession::new();
    let pending = session.start_conversation(text);
    if pending.is_none() {
        bail!("Nothing to ask");
    }
    session.settle(client, pending).await;
    finish(&session, out)
}

/// Continue an existing conversation.
pub async fn send(
    client: &ChatClient,
    conversation_id: &str,
    text: &str,
    out: &mut impl Write,
) -> Result<()> {
    let mut session = ChatSession::new();
    let load = session.select_conversation(conversation_id);
    session.settle(client, load).await;
    if session.messages().is_empty() {
        bail!("Conversation '{conversation_id}' not found");
    }

    let already_shown = session.messages().len();
    let pending = session.send_message(text);
    if pending.is_none() {
        bail!("Nothing to send");
    }
    session.settle(client, pending).await;

    if let Some(error) = session.error() {
        bail!("{error}");
    }
    print_transcript(&session.messages()[already_shown..], out)
}

pub async fn delete(client: &ChatClient, conversation_id: &str, out: &mut impl Write) -> Result<()> {
    client
        .delete_conversation(conversation_id)
        .await
        .map_err(|err| anyhow::anyhow!("Failed to delete conversation: {}", err.user_message()))?;
    writeln!(out, "🗑️  Deleted conversation {conversation_id}")?;
    Ok(())
}

/// Print the effective configuration, or write a default file with `init`.
pub fn config(config: &Config, path: &Path, init: bool, out: &mut impl Write) -> Result<()> {
    if init {
        if path.exists() {
            bail!("Config file already exists at {}", path.display());
        }
        Config::default().save(path)?;
        writeln!(out, "✨ Wrote default config to {}", path.display())?;
        return Ok(());
    }

    writeln!(out, "# {}", path.display())?;
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    write!(out, "{rendered}")?;
    Ok(())
}

fn finish(session: &ChatSession, out: &mut impl Write) -> Result<()> {
    if let Some(error) = session.error() {
        bail!("{error}");
    }
    let Some(conversation_id) = session.current_conversation() else {
        bail!("The backend did not open a conversation");
    };
    print_transcript(session.messages(), out)?;
    writeln!(out)?;
    writeln!(out, "🆔 {conversation_id}  (continue with 'lectern send {conversation_id} <message>')")?;
    Ok(())
}

fn print_transcript(messages: &[Message], out: &mut impl Write) -> Result<()> {
    for message in messages {
        writeln!(
            out,
            "[{}] {}",
            message.source.display_name(),
            message.timestamp.format("%H:%M")
        )?;
        match message.is_quiz().then(|| QuizContent::parse(&message.content)).flatten() {
            Some(quiz) => print_quiz(&quiz, out)?,
            None => writeln!(out, "{}", message.content.trim_end())?,
        }
        writeln!(out)?;
    }
    Ok(())
}

fn print_quiz(quiz: &QuizContent, out: &mut impl Write) -> Result<()> {
    if !quiz.header.is_empty() {
        writeln!(out, "{}", quiz.header)?;
    }
    for (index, question) in quiz.quiz.iter().enumerate() {
        writeln!(out, "{}. {}", index + 1, question.question)?;
        for (letter, option) in ('a'..='z').zip(&question.options) {
            writeln!(out, "   {letter}) {option}")?;
        }
    }
    if !quiz.footer.is_empty() {
        writeln!(out, "{}", quiz.footer)?;
    }
    writeln!(out, "(answer with: lectern send <id> \"1. <option>, 2. <option>\")")?;
    Ok(())
}
