//! Terminal chat interface.

pub mod app;
pub mod conversation;
pub mod sidebar;
pub mod welcome;

pub use app::App;

use crate::api::ChatClient;
use crate::config::UiConfig;
use anyhow::Result;
use crossterm::ExecutableCommand;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};

/// Raw mode plus alternate screen for as long as it lives.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn init() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute(LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Open the interactive chat and block until the user quits.
pub async fn run_chat(client: ChatClient, ui: UiConfig) -> Result<()> {
    let mut guard = TerminalGuard::init()?;
    App::new(client, ui).run(&mut guard.terminal).await
}
