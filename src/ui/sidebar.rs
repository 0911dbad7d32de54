use crate::models::ConversationSummary;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget, Widget},
};

/// Sidebar listing past conversations. Numbers match `/open <n>`.
pub struct ConversationSidebar<'a> {
    conversations: &'a [ConversationSummary],
    current: Option<&'a str>,
    highlighted: Option<usize>,
}

impl<'a> ConversationSidebar<'a> {
    pub fn new(conversations: &'a [ConversationSummary], current: Option<&'a str>) -> Self {
        Self {
            conversations,
            current,
            highlighted: None,
        }
    }

    pub fn highlighted(mut self, index: Option<usize>) -> Self {
        self.highlighted = index;
        self
    }
}

impl Widget for ConversationSidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Conversations (Ctrl+N new) ");

        if self.conversations.is_empty() {
            let inner = block.inner(area);
            block.render(area, buf);
            let line = Line::from(Span::styled(
                "No conversations yet",
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        let items: Vec<ListItem> = self
            .conversations
            .iter()
            .enumerate()
            .map(|(index, summary)| {
                let is_current = self.current == Some(summary.id.as_str());
                let title_style = if is_current {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                let mut lines = vec![Line::from(vec![
                    Span::styled(format!("{:>2}. ", index + 1), Style::default().fg(Color::DarkGray)),
                    Span::styled(summary.title.clone(), title_style),
                ])];
                if let Some(updated) = &summary.last_updated {
                    lines.push(Line::from(Span::styled(
                        format!("    {updated}"),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                ListItem::new(lines)
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("▶");

        let mut state = ListState::default().with_selected(self.highlighted);
        StatefulWidget::render(list, area, buf, &mut state);
    }
}
