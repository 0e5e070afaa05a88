//! Songbird track event handler used to wait for a clip to finish.

use async_trait::async_trait;
use songbird::{Event, EventContext, EventHandler};
use tokio::sync::mpsc;
use tracing::debug;

/// How a track stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Finished,
    Failed,
}

/// Reports a track event once, then unregisters itself.
#[derive(Clone)]
pub struct TrackWatcher {
    outcome: TrackOutcome,
    tx: mpsc::UnboundedSender<TrackOutcome>,
}

impl TrackWatcher {
    pub fn new(outcome: TrackOutcome, tx: mpsc::UnboundedSender<TrackOutcome>) -> Self {
        Self { outcome, tx }
    }
}

#[async_trait]
impl EventHandler for TrackWatcher {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, _) in tracks.iter() {
                debug!(outcome = ?self.outcome, playing = ?state.playing, "Track event");
            }
        }

        // The receiver is gone once the clip has been given up on.
        let _ = self.tx.send(self.outcome);
        Some(Event::Cancel)
    }
}
