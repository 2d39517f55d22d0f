use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Medium {
    Text,
    Json,
    Code,
    Image,
    Audio,
    Video,
    Pdf,
}

impl Medium {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Code => "code",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    CodeCompletion,
    Chat,
    Thread,
    Function,
    TextFile,
    PdfFile,
    ImageFile,
    VideoFile,
    AudioFile,
}

impl Feature {
    pub const ALL: [Feature; 9] = [
        Feature::CodeCompletion,
        Feature::Chat,
        Feature::Thread,
        Feature::Function,
        Feature::TextFile,
        Feature::PdfFile,
        Feature::ImageFile,
        Feature::VideoFile,
        Feature::AudioFile,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageModelLevel {
    Basic,
    #[default]
    Standard,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Assistant,
    System,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
}

impl RunStatus {
    /// Statuses after which the remote service will not move the run again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired
        )
    }
}

/// A single block of message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    Json { text: String },
    File { file_id: String, medium: Medium },
}

impl Content {
    /// Returns the textual body for `Text` and `Json` blocks.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::Json { text } => Some(text),
            Self::File { .. } => None,
        }
    }

    /// Parses a `Json` block. Other variants yield `None`.
    pub fn parse_json(&self) -> Option<serde_json::Result<serde_json::Value>> {
        match self {
            Self::Json { text } => Some(serde_json::from_str(text)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    created_at: DateTime<Utc>,
    role: Role,
    content: Vec<Content>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        role: Role,
        content: Vec<Content>,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            role,
            content,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &[Content] {
        &self.content
    }
}

/// One page of thread messages, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
}

impl MessageList {
    pub fn new(has_more: bool, last_id: Option<String>) -> Self {
        Self {
            messages: Vec::new(),
            has_more,
            last_id,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}

impl IntoIterator for MessageList {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

/// Application-side assistant record. `action` is fixed at construction and
/// is the key used to reconcile against remote assistants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assistant {
    action: String,
    pub name: String,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_model_name: Option<String>,
    pub medium: Medium,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Assistant {
    pub fn new(action: impl Into<String>, medium: Medium) -> Self {
        Self {
            action: action.into(),
            name: String::new(),
            instructions: String::new(),
            description: None,
            language_model_name: None,
            medium,
            service_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_language_model(mut self, model: impl Into<String>) -> Self {
        self.language_model_name = Some(model.into());
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

/// Application-side conversation record bound to one assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    action: String,
    pub medium: Medium,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Thread {
    pub fn new(action: impl Into<String>, medium: Medium) -> Self {
        Self {
            action: action.into(),
            medium,
            service_id: None,
            run_id: None,
            raw_status: None,
            status: None,
            started_at: None,
            completed_at: None,
            expires_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn is_started(&self) -> bool {
        self.service_id.is_some()
    }

    /// True once the last observed run status is terminal.
    pub fn is_settled(&self) -> bool {
        self.status.is_some_and(RunStatus::is_terminal)
    }
}
