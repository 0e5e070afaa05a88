//! Per-guild playback scheduling.
//!
//! ## Architecture
//!
//! ```text
//!  command text
//!       │ resolve
//!       ▼
//!  PlayRequest ──enqueue──► RoomRegistry ──(first request)──► PlaybackWorker
//!                              │  guild → RoomQueue                │
//!                              └──────── pop / remove_if_empty ◄───┘
//!                                                                  │
//!                                                                  ▼
//!                                                           VoiceTransport
//! ```
//!
//! Every guild with pending audio has exactly one worker. The worker keeps
//! its voice connection across queued requests and leaves once the queue
//! has drained.

pub mod queue;
pub mod registry;
pub mod transport;
pub mod worker;

pub use queue::RoomQueue;
pub use registry::{EnqueueOutcome, RoomRegistry};
pub use transport::{TransportError, VoiceTransport};

use crate::catalog::{ClipRef, ResolveError, MAX_CHAIN};
use crate::config::PlaybackConfig;
use std::time::Duration;

/// Maximum number of requests waiting behind the one being played.
pub const MAX_QUEUE: usize = 6;

/// Guild identifier.
pub type RoomId = u64;

/// Voice channel identifier.
pub type ChannelId = u64;

/// A resolved clip chain bound for one voice channel.
#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub room_id: RoomId,
    pub channel_id: ChannelId,
    clips: Vec<ClipRef>,
}

impl PlayRequest {
    /// Build a request; the chain must hold between 1 and `MAX_CHAIN` clips.
    pub fn new(room_id: RoomId, channel_id: ChannelId, clips: Vec<ClipRef>) -> Result<Self, ResolveError> {
        if clips.is_empty() {
            return Err(ResolveError::Empty);
        }
        if clips.len() > MAX_CHAIN {
            return Err(ResolveError::ChainTooLong { max: MAX_CHAIN });
        }
        Ok(Self {
            room_id,
            channel_id,
            clips,
        })
    }

    pub fn clips(&self) -> &[ClipRef] {
        &self.clips
    }

    /// Clip names for logging.
    pub fn describe(&self) -> String {
        self.clips
            .iter()
            .map(|clip| clip.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Fixed pauses around voice state changes and between clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTiming {
    /// Before joining a channel.
    pub join_delay: Duration,
    /// Before moving to another channel.
    pub switch_delay: Duration,
    /// After connecting, before the first clip.
    pub preroll: Duration,
    /// Between clips of one chain.
    pub inter_clip: Duration,
    /// After the queue drains, before disconnecting.
    pub idle_disconnect: Duration,
}

impl PlaybackTiming {
    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            join_delay: Duration::ZERO,
            switch_delay: Duration::ZERO,
            preroll: Duration::ZERO,
            inter_clip: Duration::ZERO,
            idle_disconnect: Duration::ZERO,
        }
    }
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            join_delay: Duration::from_millis(175),
            switch_delay: Duration::from_millis(250),
            preroll: Duration::from_millis(50),
            inter_clip: Duration::from_millis(25),
            idle_disconnect: Duration::from_millis(250),
        }
    }
}

impl From<&PlaybackConfig> for PlaybackTiming {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            join_delay: Duration::from_millis(config.join_delay_ms),
            switch_delay: Duration::from_millis(config.switch_delay_ms),
            preroll: Duration::from_millis(config.preroll_ms),
            inter_clip: Duration::from_millis(config.inter_clip_ms),
            idle_disconnect: Duration::from_millis(config.idle_disconnect_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Clip;
    use std::sync::Arc;

    fn clip(name: &str) -> ClipRef {
        Arc::new(Clip::new("test", name, Vec::new()))
    }

    #[test]
    fn test_request_chain_bounds() {
        assert!(matches!(PlayRequest::new(1, 2, vec![]), Err(ResolveError::Empty)));

        let chain: Vec<_> = (0..=MAX_CHAIN).map(|_| clip("a")).collect();
        assert!(matches!(
            PlayRequest::new(1, 2, chain),
            Err(ResolveError::ChainTooLong { .. })
        ));

        let request = PlayRequest::new(1, 2, vec![clip("a"), clip("b")]).unwrap();
        assert_eq!(request.describe(), "test.a test.b");
    }

    #[test]
    fn test_timing_from_config() {
        let config = PlaybackConfig::default();
        assert_eq!(PlaybackTiming::from(&config), PlaybackTiming::default());
    }
}
