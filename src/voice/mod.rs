//! Songbird-backed voice transport.
//!
//! ```text
//! PlaybackWorker ──► SongbirdTransport ──► Songbird Call (one per guild)
//!                         │                     ▲
//!                         └─ DCA1 input ────────┘  TrackWatcher reports End/Error
//! ```

pub mod handler;
pub mod source;

pub use handler::{TrackOutcome, TrackWatcher};

use crate::catalog::Clip;
use crate::playback::{ChannelId, RoomId, TransportError, VoiceTransport};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use songbird::tracks::Track;
use songbird::{Event, Songbird, TrackEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Extra time allowed past a clip's nominal length before giving up on it.
const SEND_GRACE: Duration = Duration::from_secs(5);

/// Streams clips into Discord voice channels through Songbird.
pub struct SongbirdTransport {
    songbird: Arc<Songbird>,
}

impl SongbirdTransport {
    pub fn new(songbird: Arc<Songbird>) -> Self {
        Self { songbird }
    }

    async fn connect(&self, room: RoomId, channel: ChannelId) -> Result<(), TransportError> {
        let guild_id = serenity::GuildId::new(room);
        match self
            .songbird
            .join(guild_id, serenity::ChannelId::new(channel))
            .await
        {
            Ok(_) => {
                debug!(guild_id = room, channel_id = channel, "Voice connected");
                Ok(())
            }
            Err(e) => {
                // Drop the half-open call so the next join starts clean.
                let _ = self.songbird.remove(guild_id).await;
                Err(TransportError::Join(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn join(&self, room: RoomId, channel: ChannelId) -> Result<(), TransportError> {
        self.connect(room, channel).await
    }

    async fn switch(&self, room: RoomId, channel: ChannelId) -> Result<(), TransportError> {
        // Joining with an existing call moves it.
        self.connect(room, channel).await
    }

    async fn set_speaking(&self, room: RoomId, speaking: bool) -> Result<(), TransportError> {
        // The driver raises the speaking flag itself while a track has audio.
        trace!(guild_id = room, speaking, "Speaking state");
        Ok(())
    }

    async fn send_clip(&self, room: RoomId, clip: &Clip) -> Result<(), TransportError> {
        if clip.frames().is_empty() {
            return Ok(());
        }

        let call = self
            .songbird
            .get(serenity::GuildId::new(room))
            .ok_or(TransportError::NotConnected)?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let track = Track::from(source::clip_input(clip.frames())).pause();
        let handle = call.lock().await.play(track);

        for (event, outcome) in [
            (TrackEvent::End, TrackOutcome::Finished),
            (TrackEvent::Error, TrackOutcome::Failed),
        ] {
            handle
                .add_event(Event::Track(event), TrackWatcher::new(outcome, tx.clone()))
                .map_err(|e| TransportError::Send(e.to_string()))?;
        }
        drop(tx);

        handle.play().map_err(|e| TransportError::Send(e.to_string()))?;

        match tokio::time::timeout(clip.duration() + SEND_GRACE, rx.recv()).await {
            Ok(Some(TrackOutcome::Finished)) => Ok(()),
            Ok(Some(TrackOutcome::Failed)) => Err(TransportError::Send(format!("track {} failed", clip))),
            Ok(None) => Err(TransportError::Send(format!("track {} dropped", clip))),
            Err(_) => {
                let _ = handle.stop();
                Err(TransportError::Send(format!("track {} timed out", clip)))
            }
        }
    }

    async fn leave(&self, room: RoomId) -> Result<(), TransportError> {
        self.songbird
            .remove(serenity::GuildId::new(room))
            .await
            .map_err(|e| TransportError::Leave(e.to_string()))
    }
}

impl std::fmt::Debug for SongbirdTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SongbirdTransport").finish()
    }
}
