use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Url;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::core::error::{ConfigError, ProviderError};
use crate::transport::http::{HttpTransport, RequestContext, RetryPolicy};

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com";
const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
const OPENAI_BETA_HEADER: &str = "OpenAI-Beta";
const OPENAI_BETA_ASSISTANTS: &str = "assistants=v2";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub type Metadata = IndexMap<String, String>;

/// Remote assistant as listed or returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantObject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub model: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub created_at: i64,
}

impl AssistantObject {
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(key))
            .map(String::as_str)
    }

    /// Model recorded in metadata at creation time, else the bound model.
    pub fn effective_model(&self) -> &str {
        self.metadata_value("model").unwrap_or(&self.model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub started_at: Option<i64>,
    #[serde(default)]
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageObject {
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// One vendor content block. Only the body matching `kind` is expected to be
/// present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_file: Option<ImageFileBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFileBody {
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionStatus {
    #[serde(default)]
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub first_id: Option<String>,
    #[serde(default)]
    pub last_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormatParam {
    Auto,
    JsonObject,
}

impl Serialize for ResponseFormatParam {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::JsonObject => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("type", "json_object")?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateAssistantRequest {
    pub name: String,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub model: String,
    pub response_format: ResponseFormatParam,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifyAssistantRequest {
    pub name: String,
    pub instructions: String,
    pub description: String,
    pub model: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadParams {
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateThreadAndRunRequest {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_instructions: Option<String>,
    pub thread: ThreadParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateMessageRequest {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListMessagesQuery {
    pub limit: u32,
    pub before: Option<String>,
}

/// Remote assistants service as seen by the platform.
///
/// Implementations own transport, auth and retries. Deletes report a missing
/// resource as [`ProviderError::NotFound`].
#[async_trait]
pub trait AssistantsClient: Send + Sync {
    async fn list_assistants(
        &self,
        limit: u32,
    ) -> Result<ListResponse<AssistantObject>, ProviderError>;

    async fn create_assistant(
        &self,
        req: &CreateAssistantRequest,
    ) -> Result<AssistantObject, ProviderError>;

    async fn modify_assistant(
        &self,
        assistant_id: &str,
        req: &ModifyAssistantRequest,
    ) -> Result<AssistantObject, ProviderError>;

    async fn delete_assistant(&self, assistant_id: &str) -> Result<DeletionStatus, ProviderError>;

    async fn create_thread_and_run(
        &self,
        req: &CreateThreadAndRunRequest,
    ) -> Result<RunObject, ProviderError>;

    async fn delete_thread(&self, thread_id: &str) -> Result<DeletionStatus, ProviderError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str)
    -> Result<RunObject, ProviderError>;

    async fn create_run(
        &self,
        thread_id: &str,
        req: &CreateRunRequest,
    ) -> Result<RunObject, ProviderError>;

    async fn list_messages(
        &self,
        thread_id: &str,
        query: &ListMessagesQuery,
    ) -> Result<ListResponse<MessageObject>, ProviderError>;

    async fn create_message(
        &self,
        thread_id: &str,
        req: &CreateMessageRequest,
    ) -> Result<MessageObject, ProviderError>;
}

/// [`AssistantsClient`] over the OpenAI Assistants v2 HTTP API.
pub struct HttpAssistantsClient {
    transport: HttpTransport,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAssistantsClient {
    /// Base URL comes from `OPENAI_BASE_URL` when set.
    pub fn new(api_key: Option<String>) -> Result<Self, ConfigError> {
        let base_url = std::env::var(OPENAI_BASE_URL_ENV)
            .unwrap_or_else(|_| OPENAI_DEFAULT_BASE_URL.to_string());
        Self::with_base_url(api_key, base_url)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(DEFAULT_TIMEOUT_MS, RetryPolicy::default())?;
        Ok(Self::with_transport(api_key, base_url, transport))
    }

    pub fn with_transport(
        api_key: Option<String>,
        base_url: impl Into<String>,
        transport: HttpTransport,
    ) -> Self {
        Self {
            transport,
            base_url: normalize_base_url(base_url),
            api_key: sanitize_api_key(api_key),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.base_url)
    }

    fn url_with_query(
        &self,
        operation: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, ProviderError> {
        let mut url = Url::parse(&self.url(path)).map_err(|error| ProviderError::Protocol {
            operation: operation.to_string(),
            request_id: None,
            message: format!("invalid request url: {error}"),
        })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }

    fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().cloned() {
            return Some(key);
        }

        std::env::var(OPENAI_API_KEY_ENV)
            .ok()
            .and_then(|value| sanitize_api_key(Some(value)))
    }

    fn request_context(&self, operation: &str) -> Result<RequestContext, ProviderError> {
        let api_key = self
            .resolve_api_key()
            .ok_or_else(|| ProviderError::Protocol {
                operation: operation.to_string(),
                request_id: None,
                message: format!(
                    "missing OpenAI API key; pass one explicitly or set {OPENAI_API_KEY_ENV}"
                ),
            })?;

        Ok(RequestContext::default()
            .with_bearer_token(api_key)
            .with_header(OPENAI_BETA_HEADER, OPENAI_BETA_ASSISTANTS))
    }
}

#[async_trait]
impl AssistantsClient for HttpAssistantsClient {
    async fn list_assistants(
        &self,
        limit: u32,
    ) -> Result<ListResponse<AssistantObject>, ProviderError> {
        const OP: &str = "assistants.list";
        let ctx = self.request_context(OP)?;
        let url = self.url_with_query(OP, "assistants", &[("limit", limit.to_string())])?;
        self.transport.get_json(OP, &url, &ctx).await
    }

    async fn create_assistant(
        &self,
        req: &CreateAssistantRequest,
    ) -> Result<AssistantObject, ProviderError> {
        const OP: &str = "assistants.create";
        let ctx = self.request_context(OP)?;
        self.transport
            .post_json(OP, &self.url("assistants"), req, &ctx)
            .await
    }

    async fn modify_assistant(
        &self,
        assistant_id: &str,
        req: &ModifyAssistantRequest,
    ) -> Result<AssistantObject, ProviderError> {
        const OP: &str = "assistants.modify";
        let ctx = self.request_context(OP)?;
        let url = self.url(&format!("assistants/{assistant_id}"));
        self.transport.post_json(OP, &url, req, &ctx).await
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<DeletionStatus, ProviderError> {
        const OP: &str = "assistants.delete";
        let ctx = self.request_context(OP)?;
        let url = self.url(&format!("assistants/{assistant_id}"));
        self.transport.delete_json(OP, &url, &ctx).await
    }

    async fn create_thread_and_run(
        &self,
        req: &CreateThreadAndRunRequest,
    ) -> Result<RunObject, ProviderError> {
        const OP: &str = "threads.create_and_run";
        let ctx = self.request_context(OP)?;
        self.transport
            .post_json(OP, &self.url("threads/runs"), req, &ctx)
            .await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<DeletionStatus, ProviderError> {
        const OP: &str = "threads.delete";
        let ctx = self.request_context(OP)?;
        let url = self.url(&format!("threads/{thread_id}"));
        self.transport.delete_json(OP, &url, &ctx).await
    }

    async fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunObject, ProviderError> {
        const OP: &str = "runs.retrieve";
        let ctx = self.request_context(OP)?;
        let url = self.url(&format!("threads/{thread_id}/runs/{run_id}"));
        self.transport.get_json(OP, &url, &ctx).await
    }

    async fn create_run(
        &self,
        thread_id: &str,
        req: &CreateRunRequest,
    ) -> Result<RunObject, ProviderError> {
        const OP: &str = "runs.create";
        let ctx = self.request_context(OP)?;
        let url = self.url(&format!("threads/{thread_id}/runs"));
        self.transport.post_json(OP, &url, req, &ctx).await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        query: &ListMessagesQuery,
    ) -> Result<ListResponse<MessageObject>, ProviderError> {
        const OP: &str = "messages.list";
        let ctx = self.request_context(OP)?;

        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(before) = &query.before {
            params.push(("before", before.clone()));
        }
        let url = self.url_with_query(OP, &format!("threads/{thread_id}/messages"), &params)?;
        self.transport.get_json(OP, &url, &ctx).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        req: &CreateMessageRequest,
    ) -> Result<MessageObject, ProviderError> {
        const OP: &str = "messages.create";
        let ctx = self.request_context(OP)?;
        let url = self.url(&format!("threads/{thread_id}/messages"));
        self.transport.post_json(OP, &url, req, &ctx).await
    }
}

fn normalize_base_url(base_url: impl Into<String>) -> String {
    let value = base_url.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return OPENAI_DEFAULT_BASE_URL.to_string();
    }

    trimmed.trim_end_matches('/').to_string()
}

fn sanitize_api_key(api_key: Option<String>) -> Option<String> {
    api_key.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
