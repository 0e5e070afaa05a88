//! Voice transport abstraction used by playback workers.

use super::{ChannelId, RoomId};
use crate::catalog::Clip;
use async_trait::async_trait;

/// Voice transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to join voice channel: {0}")]
    Join(String),

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to send audio: {0}")]
    Send(String),

    #[error("Failed to leave voice channel: {0}")]
    Leave(String),
}

/// A streaming voice connection keyed by room.
///
/// Each room has at most one connection, and only that room's playback
/// worker drives it, so implementations never see concurrent calls for the
/// same room.
#[async_trait]
pub trait VoiceTransport: Send + Sync + 'static {
    /// Establish a connection to `channel`.
    async fn join(&self, room: RoomId, channel: ChannelId) -> Result<(), TransportError>;

    /// Move an existing connection to another channel of the same room.
    async fn switch(&self, room: RoomId, channel: ChannelId) -> Result<(), TransportError>;

    /// Signal whether audio is being sent.
    async fn set_speaking(&self, room: RoomId, speaking: bool) -> Result<(), TransportError>;

    /// Transmit every frame of `clip` in order, returning once sent.
    async fn send_clip(&self, room: RoomId, clip: &Clip) -> Result<(), TransportError>;

    /// Tear the connection down.
    async fn leave(&self, room: RoomId) -> Result<(), TransportError>;
}
