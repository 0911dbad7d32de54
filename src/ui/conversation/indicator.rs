use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// "Assistant is thinking" line shown while a reply for the open
/// conversation is pending.
#[derive(Debug, Clone, Copy)]
pub struct LoadingIndicator {
    /// Animation frame, advanced by the UI tick
    frame: u64,
}

impl LoadingIndicator {
    pub fn new(frame: u64) -> Self {
        Self { frame }
    }

    fn dots(&self) -> &'static str {
        match self.frame % 4 {
            0 => "●",
            1 => "● ●",
            2 => "● ● ●",
            _ => "",
        }
    }
}

impl Widget for LoadingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let line = Line::from(vec![
            Span::styled("  Assistant is thinking ", Style::default().fg(Color::Gray)),
            Span::styled(self.dots(), Style::default().fg(Color::Yellow)),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
