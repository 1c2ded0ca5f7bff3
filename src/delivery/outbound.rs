//! Outbound chat surface used by the delivery pipeline and broadcasts.
//!
//! The pipeline never talks to the Bot API directly; it goes through
//! [`OutboundChannel`] so tests can swap in mocks and failure injectors.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Outbound send errors
#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected by chat api: {0}")]
    Rejected(String),
}

/// Handle to a sent status message, used to edit or delete it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusHandle {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Messages and attachments flowing back to a chat.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    /// Post a status placeholder as a reply; the handle allows later
    /// edit or deletion.
    async fn send_status(
        &self,
        chat_id: i64,
        reply_to: i64,
        text: &str,
    ) -> Result<StatusHandle, OutboundError>;

    /// Replace the text of a previously sent status message.
    async fn edit_status(&self, handle: StatusHandle, text: &str) -> Result<(), OutboundError>;

    /// Remove a previously sent status message.
    async fn delete_status(&self, handle: StatusHandle) -> Result<(), OutboundError>;

    /// Upload a staged audio file as a voice message.
    async fn send_voice_attachment(
        &self,
        chat_id: i64,
        voice: &Path,
        caption: &str,
        reply_to: i64,
    ) -> Result<(), OutboundError>;

    /// Send a plain text message, optionally as a reply.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), OutboundError>;
}
