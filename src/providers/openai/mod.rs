use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::catalog::{self, ModelTiers, ModelUpdate, ModelUpdatePolicy, TopTierPolicy};
use crate::core::error::{PlatformError, ProviderError};
use crate::core::traits::{Clock, Platform, SystemClock};
use crate::core::types::{
    Assistant, Feature, LanguageModelLevel, Medium, Message, MessageList, Thread,
};
use crate::providers::openai_client::{
    AssistantsClient, CreateRunRequest, DeletionStatus, ListMessagesQuery, RunObject,
};
use crate::providers::openai_translate::{self, OpenAiTranslator, timestamp};
use crate::providers::translator_contract::ProviderTranslator;

const PLATFORM_NAME: &str = "OpenAi";
pub const FALLBACK_MODEL: &str = "gpt-3.5-turbo";
pub const ASSISTANT_LIST_LIMIT: u32 = 50;

/// [`Platform`] over the OpenAI Assistants API.
pub struct OpenAiPlatform {
    client: Arc<dyn AssistantsClient>,
    translator: OpenAiTranslator,
    clock: Arc<dyn Clock>,
    update_policy: Arc<dyn ModelUpdatePolicy>,
    model_tiers: ModelTiers,
    fallback_model: String,
}

pub struct OpenAiPlatformBuilder {
    client: Arc<dyn AssistantsClient>,
    clock: Arc<dyn Clock>,
    /// Defaults to a [`TopTierPolicy`] on the configured advanced tier.
    update_policy: Option<Arc<dyn ModelUpdatePolicy>>,
    model_tiers: ModelTiers,
    fallback_model: String,
}

impl OpenAiPlatform {
    pub fn new(client: Arc<dyn AssistantsClient>) -> Self {
        Self::builder(client).build()
    }

    pub fn builder(client: Arc<dyn AssistantsClient>) -> OpenAiPlatformBuilder {
        OpenAiPlatformBuilder {
            client,
            clock: Arc::new(SystemClock),
            update_policy: None,
            model_tiers: ModelTiers::default(),
            fallback_model: FALLBACK_MODEL.to_string(),
        }
    }

    fn apply_run(&self, thread: &mut Thread, run: RunObject) {
        thread.started_at = timestamp(run.started_at);
        thread.completed_at = timestamp(run.completed_at);
        thread.expires_at = timestamp(run.expires_at);
        self.apply_status(thread, run.status);
    }

    fn apply_status(&self, thread: &mut Thread, raw_status: Option<String>) {
        thread.status = self.translator.decode_status(raw_status.as_deref());
        thread.raw_status = raw_status;
    }
}

impl OpenAiPlatformBuilder {
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_update_policy(mut self, policy: Arc<dyn ModelUpdatePolicy>) -> Self {
        self.update_policy = Some(policy);
        self
    }

    pub fn with_model_tiers(mut self, tiers: ModelTiers) -> Self {
        self.model_tiers = tiers;
        self
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    pub fn build(self) -> OpenAiPlatform {
        let update_policy = self.update_policy.unwrap_or_else(|| {
            Arc::new(TopTierPolicy {
                top_tier: self.model_tiers.advanced.clone(),
            })
        });

        OpenAiPlatform {
            client: self.client,
            translator: OpenAiTranslator,
            clock: self.clock,
            update_policy,
            model_tiers: self.model_tiers,
            fallback_model: self.fallback_model,
        }
    }
}

#[async_trait]
impl Platform for OpenAiPlatform {
    fn name(&self) -> &'static str {
        PLATFORM_NAME
    }

    fn supports_medium(&self, medium: Medium) -> bool {
        catalog::supports_medium(medium)
    }

    fn supports_feature(&self, medium: Medium, feature: Feature) -> bool {
        catalog::supports_feature(medium, feature)
    }

    fn suggest_model(
        &self,
        medium: Medium,
        level: LanguageModelLevel,
        features: &[Feature],
    ) -> Result<String, PlatformError> {
        catalog::suggest_model(&self.model_tiers, medium, level, features)
    }

    fn should_update_model(
        &self,
        old_model: &str,
        new_model: &str,
        medium: Medium,
        level: LanguageModelLevel,
        features: &[Feature],
    ) -> bool {
        self.update_policy.should_update(&ModelUpdate {
            old_model,
            new_model,
            medium,
            level,
            features,
        })
    }

    fn target_model<'a>(&'a self, assistant: &'a Assistant) -> &'a str {
        assistant
            .language_model_name
            .as_deref()
            .unwrap_or(&self.fallback_model)
    }

    async fn find_assistant(&self, assistant: &mut Assistant) -> Result<bool, PlatformError> {
        let listing = self.client.list_assistants(ASSISTANT_LIST_LIMIT).await?;
        let target_model = self.target_model(assistant).to_string();

        // First match in list order wins; the service lists newest first.
        let Some(found) = listing.data.into_iter().find(|candidate| {
            candidate.metadata_value("action") == Some(assistant.action())
                && candidate.effective_model() == target_model
        }) else {
            debug!(
                action = assistant.action(),
                model = %target_model,
                "no remote assistant matched"
            );
            return Ok(false);
        };

        if let Some(name) = found.name {
            assistant.name = name;
        }
        if let Some(instructions) = found.instructions {
            assistant.instructions = instructions;
        }
        assistant.description = found.description;
        assistant.created_at = timestamp(Some(found.created_at));

        debug!(
            action = assistant.action(),
            service_id = %found.id,
            "matched remote assistant"
        );
        assistant.service_id = Some(found.id);
        Ok(true)
    }

    async fn create_assistant(&self, assistant: &mut Assistant) -> Result<(), PlatformError> {
        let model = self.target_model(assistant).to_string();
        let request = openai_translate::encode_create_assistant(assistant, &model);
        let created = self.client.create_assistant(&request).await?;

        let now = self.clock.now();
        info!(
            action = assistant.action(),
            service_id = %created.id,
            model = %model,
            "created remote assistant"
        );
        assistant.service_id = Some(created.id);
        assistant.created_at = Some(now);
        assistant.updated_at = Some(now);
        Ok(())
    }

    async fn update_assistant(&self, assistant: &mut Assistant) -> Result<bool, PlatformError> {
        let Some(service_id) = assistant.service_id.clone() else {
            return Ok(false);
        };

        let model = self.target_model(assistant).to_string();
        let request = openai_translate::encode_modify_assistant(assistant, &model);
        let modified = self.client.modify_assistant(&service_id, &request).await?;

        debug!(
            service_id = %service_id,
            model = %modified.model,
            "updated remote assistant"
        );
        assistant.language_model_name = Some(modified.model);
        assistant.updated_at = Some(self.clock.now());
        Ok(true)
    }

    async fn delete_assistant(&self, assistant: &Assistant) -> Result<bool, PlatformError> {
        let Some(service_id) = assistant.service_id.as_deref() else {
            return Ok(false);
        };

        let result = self.client.delete_assistant(service_id).await;
        deletion_outcome("assistant", service_id, result)
    }

    async fn start_thread(
        &self,
        assistant: &Assistant,
        thread: &mut Thread,
        additional_instructions: Option<&str>,
    ) -> Result<(), PlatformError> {
        let assistant_id = require_assistant_id(assistant)?;
        let request =
            openai_translate::encode_create_and_run(assistant_id, thread, additional_instructions);
        let run = self.client.create_thread_and_run(&request).await?;
        if run.thread_id.trim().is_empty() {
            return Err(PlatformError::MalformedPayload {
                message: format!("run {} was returned without a thread id", run.id),
            });
        }

        let now = self.clock.now();
        info!(
            action = thread.action(),
            thread_id = %run.thread_id,
            run_id = %run.id,
            "started thread"
        );
        thread.service_id = Some(run.thread_id.clone());
        thread.run_id = Some(run.id.clone());
        thread.created_at = Some(now);
        thread.updated_at = Some(now);
        self.apply_run(thread, run);
        Ok(())
    }

    async fn refresh_thread(&self, thread: &mut Thread) -> Result<(), PlatformError> {
        let (Some(thread_id), Some(run_id)) =
            (thread.service_id.as_deref(), thread.run_id.as_deref())
        else {
            return Ok(());
        };

        let run = self.client.retrieve_run(thread_id, run_id).await?;
        debug!(
            thread_id,
            run_id,
            status = run.status.as_deref().unwrap_or_default(),
            "refreshed run"
        );

        thread.updated_at = Some(self.clock.now());
        self.apply_run(thread, run);
        Ok(())
    }

    async fn delete_thread(&self, thread: &Thread) -> Result<bool, PlatformError> {
        let Some(service_id) = thread.service_id.as_deref() else {
            return Ok(false);
        };

        let result = self.client.delete_thread(service_id).await;
        deletion_outcome("thread", service_id, result)
    }

    async fn fetch_messages(
        &self,
        thread: &Thread,
        limit: u32,
        after: Option<&str>,
    ) -> Result<MessageList, PlatformError> {
        let Some(thread_id) = thread.service_id.as_deref() else {
            return Ok(MessageList::default());
        };

        let query = ListMessagesQuery {
            limit,
            before: after.map(str::to_string),
        };
        let page = self.client.list_messages(thread_id, &query).await?;

        let mut messages = MessageList::new(page.has_more, page.last_id);
        // The service pages newest first.
        for payload in page.data.iter().rev() {
            messages.push(self.translator.decode_message(payload, thread.medium)?);
        }

        debug!(
            thread_id,
            count = messages.len(),
            has_more = messages.has_more,
            "fetched messages"
        );
        Ok(messages)
    }

    async fn reply(
        &self,
        assistant: &Assistant,
        thread: &mut Thread,
        text: &str,
    ) -> Result<Message, PlatformError> {
        let thread_id = thread
            .service_id
            .clone()
            .ok_or(PlatformError::ThreadNotStarted)?;
        let assistant_id = require_assistant_id(assistant)?;

        let sent = self
            .client
            .create_message(&thread_id, &openai_translate::encode_user_message(text))
            .await?;

        let run = self
            .client
            .create_run(
                &thread_id,
                &CreateRunRequest {
                    assistant_id: assistant_id.to_string(),
                },
            )
            .await?;

        debug!(thread_id = %thread_id, run_id = %run.id, "started follow-up run");
        thread.run_id = Some(run.id);
        thread.updated_at = Some(self.clock.now());
        thread.completed_at = timestamp(run.completed_at);
        self.apply_status(thread, run.status);

        self.translator.decode_message(&sent, thread.medium)
    }
}

fn require_assistant_id(assistant: &Assistant) -> Result<&str, PlatformError> {
    assistant
        .service_id
        .as_deref()
        .ok_or_else(|| PlatformError::AssistantNotRegistered {
            action: assistant.action().to_string(),
        })
}

fn deletion_outcome(
    resource: &str,
    service_id: &str,
    result: Result<DeletionStatus, ProviderError>,
) -> Result<bool, PlatformError> {
    match result {
        Ok(status) => {
            info!(resource, service_id, deleted = status.deleted, "deleted remote resource");
            Ok(status.deleted)
        }
        Err(error) if error.is_not_found() => {
            debug!(resource, service_id, "remote resource already gone");
            Ok(true)
        }
        Err(error) => Err(error.into()),
    }
}
