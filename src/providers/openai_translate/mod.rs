use chrono::{DateTime, Utc};

use crate::core::error::PlatformError;
use crate::core::types::{Assistant, Content, Medium, Message, Role, RunStatus, Thread};
use crate::providers::openai_client::{
    ContentBlock, CreateAssistantRequest, CreateMessageRequest, CreateThreadAndRunRequest,
    Metadata, MessageObject, ModifyAssistantRequest, ResponseFormatParam, ThreadParams,
};
use crate::providers::translator_contract::ProviderTranslator;

const METADATA_ACTION: &str = "action";
const METADATA_MODEL: &str = "model";
const USER_ROLE: &str = "user";

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct OpenAiTranslator;

impl ProviderTranslator for OpenAiTranslator {
    type MessagePayload = MessageObject;

    fn decode_status(&self, raw: Option<&str>) -> Option<RunStatus> {
        normalize_status(raw)
    }

    fn decode_message(
        &self,
        payload: &Self::MessagePayload,
        medium: Medium,
    ) -> Result<Message, PlatformError> {
        decode_openai_message(payload, medium)
    }
}

/// Exact match against the vendor run-status tokens. Never fails.
pub fn normalize_status(raw: Option<&str>) -> Option<RunStatus> {
    match raw? {
        "queued" => Some(RunStatus::Queued),
        "in_progress" => Some(RunStatus::InProgress),
        "requires_action" => Some(RunStatus::RequiresAction),
        "cancelling" => Some(RunStatus::Cancelling),
        "cancelled" => Some(RunStatus::Cancelled),
        "failed" => Some(RunStatus::Failed),
        "completed" => Some(RunStatus::Completed),
        "expired" => Some(RunStatus::Expired),
        _ => None,
    }
}

pub fn decode_role(raw: &str) -> Result<Role, PlatformError> {
    match raw {
        "assistant" => Ok(Role::Assistant),
        "system" => Ok(Role::System),
        "user" => Ok(Role::User),
        other => Err(PlatformError::UnsupportedRole {
            role: other.to_string(),
        }),
    }
}

pub fn decode_content(block: &ContentBlock, medium: Medium) -> Result<Content, PlatformError> {
    match block.kind.as_str() {
        "text" => {
            let text = block
                .text
                .as_ref()
                .ok_or_else(|| malformed("text content block without a text body"))?
                .value
                .clone();

            Ok(if medium == Medium::Json {
                Content::Json { text }
            } else {
                Content::Text { text }
            })
        }
        "image" | "image_file" => {
            let image = block
                .image_file
                .as_ref()
                .ok_or_else(|| malformed("image content block without an image_file body"))?;

            Ok(Content::File {
                file_id: image.file_id.clone(),
                medium: Medium::Image,
            })
        }
        other => Err(PlatformError::UnsupportedContentType {
            content_type: other.to_string(),
        }),
    }
}

pub(crate) fn decode_openai_message(
    payload: &MessageObject,
    medium: Medium,
) -> Result<Message, PlatformError> {
    let role = decode_role(&payload.role)?;
    let created_at = DateTime::from_timestamp(payload.created_at, 0).ok_or_else(|| {
        malformed(format!(
            "message {} has an out of range created_at: {}",
            payload.id, payload.created_at
        ))
    })?;

    let content = payload
        .content
        .iter()
        .map(|block| decode_content(block, medium))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Message::new(payload.id.clone(), created_at, role, content))
}

/// Converts vendor unix seconds. Missing and zero both mean "not reported".
pub fn timestamp(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds
        .filter(|value| *value != 0)
        .and_then(|value| DateTime::from_timestamp(value, 0))
}

pub(crate) fn assistant_metadata(action: &str, model: Option<&str>) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(METADATA_ACTION.to_string(), action.to_string());
    if let Some(model) = model {
        metadata.insert(METADATA_MODEL.to_string(), model.to_string());
    }
    metadata
}

pub(crate) fn encode_create_assistant(
    assistant: &Assistant,
    model: &str,
) -> CreateAssistantRequest {
    let response_format = if assistant.medium == Medium::Json {
        ResponseFormatParam::JsonObject
    } else {
        ResponseFormatParam::Auto
    };

    CreateAssistantRequest {
        name: assistant.name.clone(),
        instructions: assistant.instructions.clone(),
        description: assistant.description.clone(),
        model: model.to_string(),
        response_format,
        metadata: assistant_metadata(assistant.action(), Some(model)),
    }
}

pub(crate) fn encode_modify_assistant(
    assistant: &Assistant,
    model: &str,
) -> ModifyAssistantRequest {
    ModifyAssistantRequest {
        name: assistant.name.clone(),
        instructions: assistant.instructions.clone(),
        description: assistant.description.clone().unwrap_or_default(),
        model: model.to_string(),
        metadata: assistant_metadata(
            assistant.action(),
            assistant.language_model_name.as_deref(),
        ),
    }
}

pub(crate) fn encode_create_and_run(
    assistant_id: &str,
    thread: &Thread,
    additional_instructions: Option<&str>,
) -> CreateThreadAndRunRequest {
    CreateThreadAndRunRequest {
        assistant_id: assistant_id.to_string(),
        additional_instructions: additional_instructions.map(str::to_string),
        thread: ThreadParams {
            metadata: assistant_metadata(thread.action(), None),
        },
    }
}

pub(crate) fn encode_user_message(text: &str) -> CreateMessageRequest {
    CreateMessageRequest {
        role: USER_ROLE.to_string(),
        content: text.to_string(),
    }
}

fn malformed(message: impl Into<String>) -> PlatformError {
    PlatformError::MalformedPayload {
        message: message.into(),
    }
}
