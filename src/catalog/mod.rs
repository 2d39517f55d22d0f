use crate::core::error::PlatformError;
use crate::core::types::{Feature, LanguageModelLevel, Medium};

pub const STANDARD_MODEL: &str = "gpt-4o-mini";
pub const ADVANCED_MODEL: &str = "gpt-4o";
pub const IMAGE_MODEL: &str = "dall-e-3";

/// Model identifiers picked by [`suggest_model`] per tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTiers {
    pub standard: String,
    pub advanced: String,
    pub image: String,
}

impl Default for ModelTiers {
    fn default() -> Self {
        Self {
            standard: STANDARD_MODEL.to_string(),
            advanced: ADVANCED_MODEL.to_string(),
            image: IMAGE_MODEL.to_string(),
        }
    }
}

pub fn supports_medium(medium: Medium) -> bool {
    matches!(medium, Medium::Text | Medium::Code | Medium::Image)
}

pub fn supports_feature(medium: Medium, feature: Feature) -> bool {
    if !supports_medium(medium) {
        return false;
    }

    // Image generation is single-shot.
    if medium == Medium::Image {
        return false;
    }

    match feature {
        Feature::CodeCompletion => medium == Medium::Code,
        Feature::Chat | Feature::Thread => true,
        Feature::Function => false,
        Feature::TextFile
        | Feature::PdfFile
        | Feature::ImageFile
        | Feature::VideoFile
        | Feature::AudioFile => false,
    }
}

pub fn suggest_model(
    tiers: &ModelTiers,
    medium: Medium,
    level: LanguageModelLevel,
    _features: &[Feature],
) -> Result<String, PlatformError> {
    match medium {
        Medium::Text | Medium::Json | Medium::Code => Ok(match level {
            LanguageModelLevel::Basic | LanguageModelLevel::Standard => tiers.standard.clone(),
            LanguageModelLevel::Advanced => tiers.advanced.clone(),
        }),
        Medium::Image => Ok(tiers.image.clone()),
        Medium::Audio | Medium::Video | Medium::Pdf => {
            Err(PlatformError::UnsupportedMedium { medium })
        }
    }
}

/// Inputs to a [`ModelUpdatePolicy`] decision.
#[derive(Debug, Clone, Copy)]
pub struct ModelUpdate<'a> {
    pub old_model: &'a str,
    pub new_model: &'a str,
    pub medium: Medium,
    pub level: LanguageModelLevel,
    pub features: &'a [Feature],
}

/// Decides whether an existing assistant should be migrated from its bound
/// model to a newer suggestion.
pub trait ModelUpdatePolicy: Send + Sync {
    fn should_update(&self, update: &ModelUpdate<'_>) -> bool;
}

/// Wraps a closure as a [`ModelUpdatePolicy`].
pub fn policy_fn<F>(decide: F) -> PolicyFn<F>
where
    F: Fn(&ModelUpdate<'_>) -> bool + Send + Sync,
{
    PolicyFn(decide)
}

pub struct PolicyFn<F>(F);

impl<F> ModelUpdatePolicy for PolicyFn<F>
where
    F: Fn(&ModelUpdate<'_>) -> bool + Send + Sync,
{
    fn should_update(&self, update: &ModelUpdate<'_>) -> bool {
        (self.0)(update)
    }
}

/// Updates unless the assistant is already bound to the top tier model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopTierPolicy {
    pub top_tier: String,
}

impl Default for TopTierPolicy {
    fn default() -> Self {
        Self {
            top_tier: ADVANCED_MODEL.to_string(),
        }
    }
}

impl ModelUpdatePolicy for TopTierPolicy {
    fn should_update(&self, update: &ModelUpdate<'_>) -> bool {
        update.old_model != self.top_tier
    }
}
