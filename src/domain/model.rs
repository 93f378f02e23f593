use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A node of the book's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub label: String,
    pub href: String,
    #[serde(default)]
    pub children: Vec<ChapterRef>,
}

impl ChapterRef {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ChapterRef>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummaryResult {
    pub title: String,
    pub summary_markdown: String,
}

/// Summary of one chapter, ready for display.
#[derive(Debug, Clone)]
pub struct ChapterSummary {
    pub title: String,
    pub summary_markdown: String,
    pub summary_html: String,
    /// True when the summary text is an inline error message.
    pub failed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookSummary {
    pub book_title: String,
    pub chapters: Vec<ChapterSummaryResult>,
    pub summary_markdown: String,
    pub summary_html: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressState {
    pub percent_complete: u8,
    pub status_message: String,
}

impl ProgressState {
    pub fn new(percent_complete: u8, status_message: impl Into<String>) -> Self {
        Self {
            percent_complete: percent_complete.min(100),
            status_message: status_message.into(),
        }
    }
}

/// Emitted by the request executor before it waits to retry a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptEvent {
    /// The attempt that just failed, starting at 1.
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
    pub reason: String,
}

/// Per-call settings that distinguish a chapter request from a book request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub model: String,
    pub reasoning_effort: String,
    pub max_completion_tokens: u32,
    pub timeout_ms: u64,
    /// Overrides the built-in prompt template when set.
    #[serde(default)]
    pub prompt: Option<String>,
}

impl ModelProfile {
    pub fn chapter_default() -> Self {
        Self {
            model: "gpt-5-mini".to_string(),
            reasoning_effort: "low".to_string(),
            max_completion_tokens: 2000,
            timeout_ms: 30_000,
            prompt: None,
        }
    }

    pub fn book_default() -> Self {
        Self {
            model: "gpt-5-mini".to_string(),
            reasoning_effort: "medium".to_string(),
            max_completion_tokens: 4000,
            timeout_ms: 45_000,
            prompt: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub reasoning_effort: String,
    pub messages: Vec<ChatMessage>,
    pub max_completion_tokens: u32,
}

impl ChatRequest {
    pub fn from_prompt(profile: &ModelProfile, prompt: String) -> Self {
        Self {
            model: profile.model.clone(),
            reasoning_effort: profile.reasoning_effort.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            max_completion_tokens: profile.max_completion_tokens,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
    }
}

/// Raw HTTP outcome handed back by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
