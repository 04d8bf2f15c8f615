use {
    async_trait::async_trait,
    parlor_common::types::ChatType,
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// Who sent an inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Platform user ID, as a string.
    pub user_id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub is_bot: bool,
}

impl Sender {
    /// Best human-readable name: display name, then username, then user ID.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.user_id)
    }
}

/// One resolution of a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// Platform-native media reference carried by a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    /// Photo in several resolutions, smallest first.
    Photo { sizes: Vec<PhotoSize> },
    /// Arbitrary file with its declared media type.
    Document {
        file_id: String,
        mime_type: Option<String>,
        file_name: Option<String>,
    },
}

impl Attachment {
    /// File ID of the image this attachment carries, if any.
    ///
    /// Photos resolve to their largest size. Documents qualify only when the
    /// declared media type starts with `image/`.
    #[must_use]
    pub fn image_file_id(&self) -> Option<&str> {
        match self {
            Self::Photo { sizes } => sizes.last().map(|s| s.file_id.as_str()),
            Self::Document {
                file_id, mime_type, ..
            } => mime_type
                .as_deref()
                .filter(|m| m.starts_with("image/"))
                .map(|_| file_id.as_str()),
        }
    }
}

/// A message received from a platform, normalized. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Platform name, e.g. `telegram`. Used for template lookup.
    pub platform: String,
    pub account_id: String,
    pub message_id: String,
    pub sender: Sender,
    pub chat_id: String,
    pub chat_type: ChatType,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub attachment: Option<Attachment>,
    /// Platform message ID this message replies to.
    pub reply_to_message_id: Option<String>,
    /// Send time, unix seconds.
    pub date: i64,
    /// Handle the platform knows the agent by (without `@`).
    pub agent_handle: Option<String>,
}

impl InboundEvent {
    /// Message text, or the caption when there is no text.
    #[must_use]
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// File ID of a qualifying image attachment.
    #[must_use]
    pub fn image_file_id(&self) -> Option<&str> {
        self.attachment.as_ref().and_then(Attachment::image_file_id)
    }

    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image_file_id().is_some()
    }
}

/// A message the platform accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: String,
    pub chat_id: String,
    /// Text as delivered by the platform.
    pub text: String,
    /// Unix seconds.
    pub date: i64,
}

/// Send messages to a channel and resolve its media.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Send plain text, optionally as a reply to `reply_to`.
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<SentMessage>;

    /// Resolve a platform file ID into a transient download URL.
    async fn resolve_file(&self, file_id: &str) -> Result<String>;

    /// Send a "typing" indicator. No-op by default.
    async fn send_typing(&self, _chat_id: &str) -> Result<()> {
        Ok(())
    }
}
