//! Per-guild playback loop.

use super::registry::RoomRegistry;
use super::transport::TransportError;
use super::{ChannelId, PlayRequest, RoomId};
use crate::catalog::Clip;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drains one room's queue over a single reused voice connection.
pub(crate) struct PlaybackWorker {
    registry: Arc<RoomRegistry>,
    room: RoomId,
    /// Channel of the live connection, if any.
    connection: Option<ChannelId>,
}

impl PlaybackWorker {
    pub(crate) fn new(registry: Arc<RoomRegistry>, room: RoomId) -> Self {
        Self {
            registry,
            room,
            connection: None,
        }
    }

    /// Play `first`, then everything queued after it, then leave.
    pub(crate) async fn run(mut self, first: PlayRequest) {
        debug!(guild_id = self.room, "Playback worker started");

        let mut request = first;
        loop {
            self.play(&request).await;

            request = match self.next().await {
                Some(next) => next,
                None => break,
            };
        }

        debug!(guild_id = self.room, "Playback worker finished");
    }

    /// Post-play check. The registry lock is only held inside `pop` and
    /// `pop_or_remove`, never across voice I/O.
    async fn next(&mut self) -> Option<PlayRequest> {
        if let Some(next) = self.registry.pop(self.room).await {
            return Some(next);
        }

        if self.connection.is_some() {
            sleep(self.registry.timing().idle_disconnect).await;
            self.disconnect().await;
        }

        // Anything that arrived during teardown is played from a fresh join.
        self.registry.pop_or_remove(self.room).await
    }

    async fn play(&mut self, request: &PlayRequest) {
        info!(
            guild_id = self.room,
            channel_id = request.channel_id,
            clips = %request.describe(),
            "Playing sound"
        );

        self.connect(request.channel_id).await;
        if self.connection.is_none() {
            warn!(guild_id = self.room, "No voice connection, skipping play");
            return;
        }

        let timing = self.registry.timing();
        sleep(timing.preroll).await;

        for (i, clip) in request.clips().iter().enumerate() {
            if i > 0 {
                sleep(timing.inter_clip).await;
            }
            if let Err(e) = self.stream(clip).await {
                error!(guild_id = self.room, clip = %clip, error = %e, "Failed to play sound");
                // The session may be gone; the next request joins fresh.
                self.disconnect().await;
                break;
            }
        }
    }

    /// Join, move or keep the connection so it points at `channel`.
    async fn connect(&mut self, channel: ChannelId) {
        let timing = self.registry.timing();
        let transport = self.registry.transport().clone();

        match self.connection {
            None => {
                sleep(timing.join_delay).await;
                match transport.join(self.room, channel).await {
                    Ok(()) => self.connection = Some(channel),
                    Err(e) => {
                        error!(guild_id = self.room, channel_id = channel, error = %e, "Failed to join voice channel");
                    }
                }
            }
            Some(current) if current != channel => {
                sleep(timing.switch_delay).await;
                match transport.switch(self.room, channel).await {
                    Ok(()) => self.connection = Some(channel),
                    Err(e) => {
                        error!(guild_id = self.room, channel_id = channel, error = %e, "Failed to change voice channel");
                        self.disconnect().await;
                    }
                }
            }
            Some(_) => {}
        }
    }

    async fn stream(&self, clip: &Clip) -> Result<(), TransportError> {
        let transport = self.registry.transport();

        transport.set_speaking(self.room, true).await?;
        let sent = transport.send_clip(self.room, clip).await;
        if let Err(e) = transport.set_speaking(self.room, false).await {
            warn!(guild_id = self.room, error = %e, "Failed to clear speaking state");
        }
        sent
    }

    async fn disconnect(&mut self) {
        if self.connection.take().is_none() {
            return;
        }
        if let Err(e) = self.registry.transport().leave(self.room).await {
            warn!(guild_id = self.room, error = %e, "Failed to leave voice channel");
        }
    }
}

async fn sleep(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
