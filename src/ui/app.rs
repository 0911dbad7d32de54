use crate::api::ChatClient;
use crate::config::UiConfig;
use crate::events::AppEvent;
use crate::session::{ChatSession, PendingRequest};
use crate::ui::conversation::{
    Composer, ComposerResult, LoadingIndicator, ParsedCommand, SlashCommand, TranscriptView,
    get_help_text,
};
use crate::ui::sidebar::ConversationSidebar;
use crate::ui::welcome::WelcomeScreen;
use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

const SIDEBAR_WIDTH: u16 = 34;
const SCROLL_STEP: usize = 5;
const WELCOME_PLACEHOLDER: &str = "Type your question here...";
const CHAT_PLACEHOLDER: &str = "Type your message...";

/// Interactive chat: owns the session and runs backend requests on
/// spawned tasks, folding their replies back in as they arrive.
pub struct App {
    session: ChatSession,
    client: ChatClient,
    composer: Composer,
    ui: UiConfig,
    sidebar_open: bool,
    highlighted: Option<usize>,
    scroll: usize,
    notice: Option<String>,
    help_visible: bool,
    tick: u64,
    running: bool,
    in_flight: usize,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(client: ChatClient, ui: UiConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session: ChatSession::new(),
            client,
            composer: Composer::new(WELCOME_PLACEHOLDER),
            sidebar_open: ui.sidebar_open,
            ui,
            highlighted: None,
            scroll: 0,
            notice: None,
            help_visible: false,
            tick: 0,
            running: true,
            in_flight: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Main event loop
    pub async fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut event_stream = EventStream::new();
        let mut ticker = tokio::time::interval(Duration::from_millis(300));

        let initial = self.session.refresh_conversations();
        self.dispatch([initial]);

        while self.running {
            self.sync_composer();
            terminal.draw(|frame| self.draw(frame))?;

            tokio::select! {
                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        error!(error = %err, "terminal event stream failed");
                        return Err(err.into());
                    }
                    None => self.running = false,
                },
                Some(event) = self.events_rx.recv() => self.handle_app_event(event),
                _ = ticker.tick() => self.tick = self.tick.wrapping_add(1),
            }
        }

        info!("leaving chat");
        Ok(())
    }

    /// Run each request on its own task. Nothing is ever cancelled; stale
    /// replies are sorted out by the session when they land.
    fn dispatch(&mut self, pending: impl IntoIterator<Item = PendingRequest>) {
        for PendingRequest { token, request } in pending {
            self.in_flight += 1;
            let client = self.client.clone();
            let events_tx = self.events_tx.clone();
            tokio::spawn(async move {
                let reply = client.execute(&request).await;
                if events_tx.send(AppEvent::Completed { token, reply }).is_err() {
                    debug!("reply arrived after the chat closed");
                }
            });
        }
    }

    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Completed { token, reply } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                let follow_ups = self.session.complete(token, reply);
                self.dispatch(follow_ups);
                self.clamp_highlight();
            }
        }
    }

    fn sync_composer(&mut self) {
        self.composer.set_enabled(!self.session.is_loading());
        self.composer.set_placeholder(if self.session.is_welcome() {
            WELCOME_PLACEHOLDER
        } else {
            CHAT_PLACEHOLDER
        });
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.running = false;
            return;
        }
        if self.help_visible {
            self.help_visible = false;
            return;
        }
        self.notice = None;
        self.sync_composer();

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('n') => self.new_conversation(),
                KeyCode::Char('b') => self.sidebar_open = !self.sidebar_open,
                KeyCode::Char('o') => {
                    if let Some(index) = self.highlighted {
                        self.open(index);
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(index) = self.highlighted {
                        self.delete(Some(index));
                    }
                }
                KeyCode::Up => self.move_highlight(-1),
                KeyCode::Down => self.move_highlight(1),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::PageUp => self.scroll = self.scroll.saturating_add(SCROLL_STEP),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(SCROLL_STEP),
            _ => match self.composer.handle_key(key) {
                ComposerResult::Submitted(text) => {
                    let pending = self.session.send_message(&text);
                    self.scroll = 0;
                    self.dispatch(pending);
                }
                ComposerResult::Command(command) => self.handle_command(command),
                ComposerResult::None => {}
            },
        }
    }

    fn handle_command(&mut self, command: ParsedCommand) {
        if !command.command.available_while_loading() && self.session.is_loading() {
            self.notice = Some("Wait for the current reply first".to_string());
            return;
        }

        match command.command {
            SlashCommand::New => self.new_conversation(),
            SlashCommand::Open => match command.position() {
                Some(index) => self.open(index),
                None => self.notice = Some("Usage: /open <n>".to_string()),
            },
            SlashCommand::Delete => self.delete(command.position()),
            SlashCommand::Topic => {
                let topic = command
                    .position()
                    .and_then(|index| self.ui.suggested_topics.get(index))
                    .cloned();
                match topic {
                    Some(topic) => {
                        let pending = self.session.start_conversation(&topic);
                        self.scroll = 0;
                        self.dispatch(pending);
                    }
                    None => self.notice = Some("Usage: /topic <n>".to_string()),
                }
            }
            SlashCommand::Answer => {
                let Some((question, option)) = command.answer_target() else {
                    self.notice = Some("Usage: /answer <question> <option>".to_string());
                    return;
                };
                let Some(quiz) = self.session.open_quiz() else {
                    self.notice = Some("There is no open quiz to answer".to_string());
                    return;
                };
                if let Err(err) = self.session.select_quiz_answer(quiz, question, option) {
                    self.notice = Some(err.to_string());
                }
            }
            SlashCommand::Submit => {
                let Some(quiz) = self.session.open_quiz() else {
                    self.notice = Some("There is no open quiz to submit".to_string());
                    return;
                };
                match self.session.submit_quiz(quiz) {
                    Ok(pending) => {
                        self.scroll = 0;
                        self.dispatch([pending]);
                    }
                    Err(err) => self.notice = Some(err.to_string()),
                }
            }
            SlashCommand::Refresh => {
                let pending = self.session.refresh_conversations();
                self.dispatch([pending]);
            }
            SlashCommand::Sidebar => self.sidebar_open = !self.sidebar_open,
            SlashCommand::Help => self.help_visible = true,
            SlashCommand::Bye => self.running = false,
        }
    }

    fn new_conversation(&mut self) {
        self.session.new_conversation();
        self.scroll = 0;
    }

    fn open(&mut self, index: usize) {
        let Some(id) = self
            .session
            .conversations()
            .get(index)
            .map(|summary| summary.id.clone())
        else {
            self.notice = Some(format!("No conversation {}", index + 1));
            return;
        };
        self.highlighted = Some(index);
        self.scroll = 0;
        let pending = self.session.select_conversation(&id);
        self.dispatch(pending);
    }

    fn delete(&mut self, index: Option<usize>) {
        let id = match index {
            Some(index) => self
                .session
                .conversations()
                .get(index)
                .map(|summary| summary.id.clone()),
            None => self.session.current_conversation().map(str::to_string),
        };
        match id {
            Some(id) => {
                let pending = self.session.delete_conversation(&id);
                self.dispatch([pending]);
            }
            None => self.notice = Some("Nothing to delete".to_string()),
        }
    }

    fn move_highlight(&mut self, delta: isize) {
        let len = self.session.conversations().len();
        if len == 0 {
            self.highlighted = None;
            return;
        }
        let current = self.highlighted.map(|i| i as isize).unwrap_or(-1);
        let next = (current + delta).rem_euclid(len as isize);
        self.highlighted = Some(next as usize);
    }

    fn clamp_highlight(&mut self) {
        let len = self.session.conversations().len();
        self.highlighted = match self.highlighted {
            _ if len == 0 => None,
            Some(index) => Some(index.min(len - 1)),
            None => None,
        };
    }

    pub fn draw(&self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(5),    // Body
                Constraint::Length(1), // Status
            ])
            .split(frame.size());

        let header = Line::from(Span::styled(
            " 💬 AI Teaching Assistant ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(header), rows[0]);

        let main_area = if self.sidebar_open && rows[1].width > SIDEBAR_WIDTH * 2 {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
                .split(rows[1]);
            frame.render_widget(
                ConversationSidebar::new(
                    self.session.conversations(),
                    self.session.current_conversation(),
                )
                .highlighted(self.highlighted),
                columns[0],
            );
            columns[1]
        } else {
            rows[1]
        };

        self.draw_main(frame, main_area);
        self.draw_status(frame, rows[2]);

        if self.help_visible {
            let area = frame.size();
            self.draw_help(frame, area);
        }
    }

    fn draw_main(&self, frame: &mut Frame, area: Rect) {
        let banner_height = if self.session.error().is_some() { 3 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(banner_height), // Error banner
                Constraint::Min(3),                // Transcript
                Constraint::Length(1),             // Loading indicator
                Constraint::Length(3),             // Composer
            ])
            .split(area);

        if let Some(error) = self.session.error() {
            let banner = Paragraph::new(error.to_string())
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL).title(" Error "))
                .wrap(Wrap { trim: true });
            frame.render_widget(banner, chunks[0]);
        }

        if self.session.is_welcome() {
            frame.render_widget(WelcomeScreen::new(&self.ui.suggested_topics), chunks[1]);
        } else {
            frame.render_widget(
                TranscriptView::new(&self.session)
                    .show_timestamps(self.ui.show_timestamps)
                    .scroll(self.scroll),
                chunks[1],
            );
        }

        if self.session.is_loading() {
            frame.render_widget(LoadingIndicator::new(self.tick), chunks[2]);
        }

        frame.render_widget(&self.composer, chunks[3]);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let line = match &self.notice {
            Some(notice) => Line::from(Span::styled(format!(" {notice}"), Style::default().fg(Color::Yellow))),
            None => Line::from(Span::styled(
                " /help commands · Ctrl+N new · Ctrl+B sidebar · Ctrl+↑↓ pick · Ctrl+O open · Ctrl+C quit",
                Style::default().fg(Color::DarkGray),
            )),
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(4).min(84);
        let height = area.height.saturating_sub(2).min(20);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        };
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(get_help_text())
                .block(Block::default().borders(Borders::ALL).title(" Help (any key to close) "))
                .wrap(Wrap { trim: false }),
            popup,
        );
    }
}
