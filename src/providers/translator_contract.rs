use crate::core::error::PlatformError;
use crate::core::types::{Medium, Message, RunStatus};

/// Internal provider-layer translation contract.
///
/// `Platform` is the caller-facing extension point. This contract is
/// crate-private and used by provider modules to turn vendor payloads into
/// the canonical message and status types.
pub(crate) trait ProviderTranslator {
    /// Vendor message payload decoded by [`ProviderTranslator::decode_message`].
    type MessagePayload;

    /// Maps a vendor run status onto [`RunStatus`]; unknown values yield `None`.
    fn decode_status(&self, raw: Option<&str>) -> Option<RunStatus>;

    /// Builds a canonical message. `medium` selects between text and JSON
    /// content for textual blocks.
    fn decode_message(
        &self,
        payload: &Self::MessagePayload,
        medium: Medium,
    ) -> Result<Message, PlatformError>;
}
