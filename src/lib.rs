pub mod catalog;
pub mod core;
pub mod providers;
pub mod transport;

pub use core::error::{ErrorKind, PlatformError, ProviderError};
pub use core::traits::{Platform, Reconciliation};
pub use core::types::*;
pub use providers::openai::{OpenAiPlatform, OpenAiPlatformBuilder};
pub use providers::openai_client::{AssistantsClient, HttpAssistantsClient};
