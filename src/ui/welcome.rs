use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

/// Shown when no conversation is open.
pub struct WelcomeScreen<'a> {
    topics: &'a [String],
}

impl<'a> WelcomeScreen<'a> {
    pub fn new(topics: &'a [String]) -> Self {
        Self { topics }
    }
}

impl Widget for WelcomeScreen<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut lines = vec![
            Line::default(),
            Line::from(Span::styled(
                "Ready to Learn Something New?",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(
                "Ask any question below or explore a suggested topic",
                Style::default().fg(Color::Gray),
            )),
            Line::default(),
        ];

        if !self.topics.is_empty() {
            lines.push(Line::from(Span::styled(
                "Popular Topics",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::default());
            for (index, topic) in self.topics.iter().enumerate() {
                lines.push(Line::from(vec![
                    Span::styled(format!("✨ /topic {}  ", index + 1), Style::default().fg(Color::Blue)),
                    Span::raw(topic.clone()),
                ]));
            }
        }

        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" Welcome "))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
