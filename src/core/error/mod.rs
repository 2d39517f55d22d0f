use thiserror::Error;

use crate::core::types::Medium;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid timeout: {timeout_ms} ms")]
    InvalidTimeout { timeout_ms: u64 },
    #[error("invalid retry policy: {reason}")]
    InvalidRetryPolicy { reason: String },
}

/// Failures reported by the remote service client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error(
        "provider credentials rejected{context}: {message}",
        context = format_context(.operation, .request_id.as_deref(), None)
    )]
    CredentialsRejected {
        operation: String,
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "remote resource not found{context}: {message}",
        context = format_context(.operation, .request_id.as_deref(), None)
    )]
    NotFound {
        operation: String,
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "provider status error{context}: {message}",
        context = format_context(.operation, .request_id.as_deref(), Some(*.status_code))
    )]
    Status {
        operation: String,
        status_code: u16,
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "provider transport error{context}: {message}",
        context = format_context(.operation, .request_id.as_deref(), None)
    )]
    Transport {
        operation: String,
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "provider protocol error{context}: {message}",
        context = format_context(.operation, .request_id.as_deref(), None)
    )]
    Protocol {
        operation: String,
        request_id: Option<String>,
        message: String,
    },
    #[error(
        "provider serialization error{context}: {message}",
        context = format_context(.operation, .request_id.as_deref(), None)
    )]
    Serialization {
        operation: String,
        request_id: Option<String>,
        message: String,
    },
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn operation(&self) -> &str {
        match self {
            Self::CredentialsRejected { operation, .. }
            | Self::NotFound { operation, .. }
            | Self::Status { operation, .. }
            | Self::Transport { operation, .. }
            | Self::Protocol { operation, .. }
            | Self::Serialization { operation, .. } => operation,
        }
    }
}

/// Coarse classification of a [`PlatformError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unsupported medium, role or content type. Never retry.
    Configuration,
    /// Operation called on an entity missing required linkage.
    Usage,
    /// Remote service failure or malformed remote data.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("unsupported medium: {medium}")]
    UnsupportedMedium { medium: Medium },
    #[error("unsupported message role: {role}")]
    UnsupportedRole { role: String },
    #[error("unsupported content type: {content_type}")]
    UnsupportedContentType { content_type: String },
    #[error("thread has not been started")]
    ThreadNotStarted,
    #[error("assistant is not registered with the remote service [action={action}]")]
    AssistantNotRegistered { action: String },
    #[error("malformed remote payload: {message}")]
    MalformedPayload { message: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PlatformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedMedium { .. }
            | Self::UnsupportedRole { .. }
            | Self::UnsupportedContentType { .. }
            | Self::Config(_) => ErrorKind::Configuration,
            Self::ThreadNotStarted | Self::AssistantNotRegistered { .. } => ErrorKind::Usage,
            Self::MalformedPayload { .. } | Self::Provider(_) => ErrorKind::Remote,
        }
    }
}

fn format_context(operation: &str, request_id: Option<&str>, status_code: Option<u16>) -> String {
    let mut context = Vec::new();

    if !operation.is_empty() {
        context.push(format!("operation={operation}"));
    }
    if let Some(request_id) = request_id {
        context.push(format!("request_id={request_id}"));
    }
    if let Some(status_code) = status_code {
        context.push(format!("status_code={status_code}"));
    }

    if context.is_empty() {
        String::new()
    } else {
        format!(" [{}]", context.join(", "))
    }
}

#[cfg(test)]
mod tests;
