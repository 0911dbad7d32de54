//! Transcript display component

use crate::models::{AgentSource, Message};
use crate::quiz::{QuizContent, QuizSelection};
use crate::session::ChatSession;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Renders the transcript of the conversation on screen, newest at the bottom.
pub struct TranscriptView<'a> {
    session: &'a ChatSession,
    show_timestamps: bool,
    /// Lines scrolled up from the bottom
    scroll: usize,
}

impl<'a> TranscriptView<'a> {
    pub fn new(session: &'a ChatSession) -> Self {
        Self {
            session,
            show_timestamps: true,
            scroll: 0,
        }
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    fn title(&self) -> String {
        let title = self.session.current_conversation().and_then(|id| {
            self.session
                .conversations()
                .iter()
                .find(|summary| summary.id == id)
                .map(|summary| summary.title.clone())
        });
        match title {
            Some(title) => format!(" {title} "),
            None => " Conversation ".to_string(),
        }
    }

    /// Every line of the transcript at the given width.
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for (index, message) in self.session.messages().iter().enumerate() {
            lines.extend(self.render_message(index, message, width));
            lines.push(Line::default());
        }
        lines
    }

    fn render_message(&self, index: usize, message: &Message, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let style = source_style(message.source);

        let mut header = vec![Span::styled(
            format!("{} {}", source_icon(message.source), message.source.display_name()),
            style.add_modifier(Modifier::BOLD),
        )];
        if self.show_timestamps {
            header.push(Span::styled(
                format!("  {}", message.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(header));

        let text_width = width.saturating_sub(2) as usize;
        let quiz = message
            .is_quiz()
            .then(|| QuizContent::parse(&message.content))
            .flatten();

        match quiz {
            Some(quiz) => {
                let selection = self.session.quiz_selection(index);
                lines.extend(render_quiz(&quiz, selection, message.is_submitted, text_width, style));
            }
            None => {
                for content_line in wrap_text(&message.content, text_width) {
                    lines.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(content_line, style),
                    ]));
                }
            }
        }

        lines
    }
}

impl Widget for TranscriptView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title(self.title());
        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = self.lines(inner_area.width);
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_scroll = total.saturating_sub(height);
        let end = total - self.scroll.min(max_scroll);
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn render_quiz(
    quiz: &QuizContent,
    selection: Option<&QuizSelection>,
    submitted: bool,
    width: usize,
    style: Style,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let indent = |text: String, style: Style| Line::from(vec![Span::raw("  "), Span::styled(text, style)]);

    for text in wrap_text(&quiz.header, width) {
        if !text.is_empty() {
            lines.push(indent(text, style.add_modifier(Modifier::BOLD)));
        }
    }

    for (q, question) in quiz.quiz.iter().enumerate() {
        for text in wrap_text(&format!("{}. {}", q + 1, question.question), width) {
            lines.push(indent(text, style));
        }
        let picked = selection.and_then(|selection| selection.picked(q));
        for (o, option) in question.options.iter().enumerate() {
            let chosen = picked == Some(o);
            let marker = if chosen { "[x]" } else { "[ ]" };
            let letter = (b'a' + (o % 26) as u8) as char;
            let option_style = if chosen {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else if submitted {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            lines.push(indent(format!("   {marker} {letter}) {option}"), option_style));
        }
    }

    for text in wrap_text(&quiz.footer, width) {
        if !text.is_empty() {
            lines.push(indent(text, style));
        }
    }

    let status = if submitted {
        "✔ Answers submitted".to_string()
    } else {
        "Answer with /answer <question> <option>, then /submit".to_string()
    };
    lines.push(indent(status, Style::default().fg(Color::DarkGray)));
    lines
}

fn source_style(source: AgentSource) -> Style {
    match source {
        AgentSource::User => Style::default().fg(Color::Blue),
        AgentSource::CourseOutline => Style::default().fg(Color::Magenta),
        AgentSource::Quiz => Style::default().fg(Color::Green),
        AgentSource::TopicExplainer => Style::default().fg(Color::Yellow),
        AgentSource::Assistant => Style::default().fg(Color::Gray),
    }
}

fn source_icon(source: AgentSource) -> &'static str {
    match source {
        AgentSource::User => "👤",
        AgentSource::CourseOutline => "📘",
        AgentSource::Quiz => "🎓",
        AgentSource::TopicExplainer => "🧠",
        AgentSource::Assistant => "🤖",
    }
}

/// Wrap text to fit within the given width, keeping the author's line breaks.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current_line = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + word_len + 1 > width {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }
            if current_len > 0 {
                current_line.push(' ');
                current_len += 1;
            }
            current_line.push_str(word);
            current_len += word_len;
        }
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn keeps_paragraph_breaks() {
        let lines = wrap_text("# Title\n\n- item", 40);
        assert_eq!(lines, vec!["# Title", "", "- item"]);
    }

    #[test]
    fn quiz_marks_selected_options() {
        let quiz = QuizContent::parse(
            r#"{"header": "Check", "quiz": [{"question": "Capital of France?", "options": ["Berlin", "Paris"]}], "footer": ""}"#,
        )
        .unwrap();
        let mut selection = QuizSelection::new();
        selection.select(&quiz, 0, 1).unwrap();

        let lines = render_quiz(&quiz, Some(&selection), false, 60, Style::default());
        let text: Vec<String> = lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect();

        assert!(text.iter().any(|line| line.contains("[ ] a) Berlin")));
        assert!(text.iter().any(|line| line.contains("[x] b) Paris")));
        assert!(text.last().unwrap().contains("/submit"));
    }

    #[test]
    fn duplicate_options_mark_only_the_pick() {
        let quiz = QuizContent::parse("1. Which one?\na) same\nb) same\nc) other").unwrap();
        let mut selection = QuizSelection::new();
        selection.select(&quiz, 0, 1).unwrap();

        let lines = render_quiz(&quiz, Some(&selection), false, 60, Style::default());
        let text: Vec<String> = lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect();

        assert!(text.iter().any(|line| line.contains("[ ] a) same")));
        assert!(text.iter().any(|line| line.contains("[x] b) same")));
        assert_eq!(text.iter().filter(|line| line.contains("[x]")).count(), 1);
    }
}
