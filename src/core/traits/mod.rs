use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::error::PlatformError;
use crate::core::types::{
    Assistant, Feature, LanguageModelLevel, Medium, Message, MessageList, Thread,
};

pub const DEFAULT_MESSAGE_PAGE_SIZE: u32 = 20;

/// Outcome of [`Platform::reconcile_assistant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Found,
    Updated,
    Created,
}

/// Vendor-neutral contract for driving a remote assistant service.
///
/// Every operation takes the entities it reads or mutates; implementations
/// keep no per-entity state between calls. Callers serialize concurrent
/// operations on the same assistant or thread.
#[async_trait]
pub trait Platform: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports_medium(&self, medium: Medium) -> bool;

    fn supports_feature(&self, medium: Medium, feature: Feature) -> bool;

    fn suggest_model(
        &self,
        medium: Medium,
        level: LanguageModelLevel,
        features: &[Feature],
    ) -> Result<String, PlatformError>;

    fn should_update_model(
        &self,
        old_model: &str,
        new_model: &str,
        medium: Medium,
        level: LanguageModelLevel,
        features: &[Feature],
    ) -> bool;

    /// Model `assistant` is reconciled against: its override, else the
    /// platform fallback.
    fn target_model<'a>(&'a self, assistant: &'a Assistant) -> &'a str;

    /// Looks up a remote assistant matching the local action and target model.
    /// Returns `false` without touching `assistant` when nothing matches.
    async fn find_assistant(&self, assistant: &mut Assistant) -> Result<bool, PlatformError>;

    /// Creates the remote assistant. Not idempotent: call `find_assistant` first.
    async fn create_assistant(&self, assistant: &mut Assistant) -> Result<(), PlatformError>;

    async fn update_assistant(&self, assistant: &mut Assistant) -> Result<bool, PlatformError>;

    async fn delete_assistant(&self, assistant: &Assistant) -> Result<bool, PlatformError>;

    async fn start_thread(
        &self,
        assistant: &Assistant,
        thread: &mut Thread,
        additional_instructions: Option<&str>,
    ) -> Result<(), PlatformError>;

    async fn refresh_thread(&self, thread: &mut Thread) -> Result<(), PlatformError>;

    async fn delete_thread(&self, thread: &Thread) -> Result<bool, PlatformError>;

    async fn fetch_messages(
        &self,
        thread: &Thread,
        limit: u32,
        after: Option<&str>,
    ) -> Result<MessageList, PlatformError>;

    /// Sends a user turn and starts a new run. Returns the sent message; the
    /// assistant's answer arrives through later `fetch_messages` polls.
    async fn reply(
        &self,
        assistant: &Assistant,
        thread: &mut Thread,
        text: &str,
    ) -> Result<Message, PlatformError>;

    /// Find-or-create, migrating the bound model when the update policy asks
    /// for it.
    async fn reconcile_assistant(
        &self,
        assistant: &mut Assistant,
        level: LanguageModelLevel,
        features: &[Feature],
    ) -> Result<Reconciliation, PlatformError> {
        if !self.find_assistant(assistant).await? {
            self.create_assistant(assistant).await?;
            return Ok(Reconciliation::Created);
        }

        let current = self.target_model(assistant).to_string();
        let suggested = self.suggest_model(assistant.medium, level, features)?;
        if suggested == current
            || !self.should_update_model(&current, &suggested, assistant.medium, level, features)
        {
            return Ok(Reconciliation::Found);
        }

        assistant.language_model_name = Some(suggested);
        self.update_assistant(assistant).await?;
        Ok(Reconciliation::Updated)
    }
}

/// Injected time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
