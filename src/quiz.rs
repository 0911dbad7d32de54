//! Quiz messages: parsing the quiz agent's payload, tracking the user's
//! answer picks, and formatting the reply sent back to the backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizContent {
    #[serde(default)]
    pub header: String,
    pub quiz: Vec<QuizQuestion>,
    #[serde(default)]
    pub footer: String,
}

impl QuizContent {
    /// Parse a quiz agent message.
    ///
    /// The agent normally writes markdown: numbered questions, each followed
    /// by lettered options (`a)`, `B.`, `(c)`). A JSON payload
    /// `{header, quiz: [{question, options}], footer}` is accepted too.
    /// Returns `None` for anything else, e.g. feedback prose.
    pub fn parse(content: &str) -> Option<Self> {
        Self::parse_json(content).or_else(|| Self::parse_markdown(content))
    }

    fn parse_json(content: &str) -> Option<Self> {
        let body = strip_code_fence(content.trim());
        let quiz: QuizContent = serde_json::from_str(body).ok()?;
        if quiz.quiz.is_empty() {
            return None;
        }
        Some(quiz)
    }

    fn parse_markdown(content: &str) -> Option<Self> {
        let mut header: Vec<String> = Vec::new();
        let mut footer: Vec<String> = Vec::new();
        let mut questions: Vec<QuizQuestion> = Vec::new();

        for raw in content.lines() {
            let line = clean_line(raw);
            if line.is_empty() {
                continue;
            }
            if let Some(question) = question_text(&line) {
                // Text between two questions belongs to neither.
                footer.clear();
                questions.push(QuizQuestion {
                    question: question.to_string(),
                    options: Vec::new(),
                });
                continue;
            }

            let option = option_text(&line).map(str::to_string);
            match questions.last_mut() {
                None => header.push(line),
                Some(current) => match option {
                    Some(option) if footer.is_empty() => current.options.push(option),
                    _ if current.options.is_empty() => {
                        current.question.push(' ');
                        current.question.push_str(&line);
                    }
                    _ => footer.push(line),
                },
            }
        }

        // A numbered list without choices is an outline, not a quiz.
        if questions.is_empty() || questions.iter().any(|q| q.options.len() < 2) {
            return None;
        }

        Some(QuizContent {
            header: header.join("\n"),
            quiz: questions,
            footer: footer.join("\n"),
        })
    }

    pub fn question_count(&self) -> usize {
        self.quiz.len()
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening line.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Trim a markdown line down to its text: bullets and bold markers go.
fn clean_line(raw: &str) -> String {
    let line = raw.trim().replace("**", "");
    let line = line.trim();
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line)
        .trim()
        .to_string()
}

/// `1. text`, `2) text`, `Question 3: text`, `### Q4. text`
fn question_text(line: &str) -> Option<&str> {
    let line = line.trim_start_matches('#').trim_start();
    let line = ["Question ", "question ", "Q", "q"]
        .iter()
        .find_map(|prefix| {
            line.strip_prefix(prefix)
                .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        })
        .unwrap_or(line);

    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix(['.', ')', ':'])?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    (!text.is_empty()).then_some(text)
}

/// `a) text`, `B. text`, `(c) text`
fn option_text(line: &str) -> Option<&str> {
    let line = line.strip_prefix('(').unwrap_or(line);
    let mut chars = line.chars();
    let letter = chars.next()?;
    if !matches!(letter.to_ascii_lowercase(), 'a'..='h') {
        return None;
    }
    let rest = chars.as_str().strip_prefix([')', '.', ':'])?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    (!text.is_empty()).then_some(text)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    #[error("message {0} is not a quiz")]
    NotAQuiz(usize),

    #[error("this quiz has no selectable answers; reply in the composer instead")]
    Unstructured,

    #[error("this quiz was already submitted")]
    AlreadySubmitted,

    #[error("quiz has no question {0}")]
    NoSuchQuestion(usize),

    #[error("question {question} has no option {option}")]
    NoSuchOption { question: usize, option: usize },

    #[error("answer every question before submitting (missing: {})", format_missing(.0))]
    Incomplete(Vec<usize>),

    #[error("no open conversation")]
    NoConversation,

    #[error("wait for the current reply before submitting")]
    Busy,
}

fn format_missing(missing: &[usize]) -> String {
    missing
        .iter()
        .map(|index| (index + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pick {
    option: usize,
    text: String,
}

/// Answers picked so far for one quiz, keyed by zero-based question index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizSelection {
    answers: BTreeMap<usize, Pick>,
}

impl QuizSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick `option` (zero-based) for `question` (zero-based). Re-picking replaces.
    pub fn select(
        &mut self,
        quiz: &QuizContent,
        question: usize,
        option: usize,
    ) -> Result<(), QuizError> {
        let entry = quiz
            .quiz
            .get(question)
            .ok_or(QuizError::NoSuchQuestion(question + 1))?;
        let answer = entry.options.get(option).ok_or(QuizError::NoSuchOption {
            question: question + 1,
            option: option + 1,
        })?;
        self.answers.insert(
            question,
            Pick {
                option,
                text: answer.clone(),
            },
        );
        Ok(())
    }

    /// Text of the option picked for `question`.
    pub fn answer(&self, question: usize) -> Option<&str> {
        self.answers.get(&question).map(|pick| pick.text.as_str())
    }

    /// Zero-based index of the option picked for `question`.
    pub fn picked(&self, question: usize) -> Option<usize> {
        self.answers.get(&question).map(|pick| pick.option)
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Zero-based indices of questions still unanswered.
    pub fn missing(&self, quiz: &QuizContent) -> Vec<usize> {
        (0..quiz.question_count())
            .filter(|index| !self.answers.contains_key(index))
            .collect()
    }

    /// Format as `"1. <answer>, 2. <answer>"`, ordered by question index.
    pub fn to_reply(&self) -> String {
        self.answers
            .iter()
            .map(|(index, pick)| format!("{}. {}", index + 1, pick.text))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
