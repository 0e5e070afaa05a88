//! Process-wide map of guilds with live playback workers.

use super::queue::RoomQueue;
use super::transport::VoiceTransport;
use super::worker::PlaybackWorker;
use super::{PlayRequest, PlaybackTiming, RoomId, MAX_QUEUE};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// What happened to an enqueued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// A new worker was started and is playing the request now.
    Started,
    /// The request waits behind the current one at this 1-based position.
    Queued { position: usize },
    /// The room's queue was full; the request was discarded.
    Dropped,
}

/// Owns every room queue behind a single lock.
///
/// A room is live while it has an entry here. The entry is created by
/// [`RoomRegistry::enqueue`] together with the room's worker and removed
/// only by that worker, so a live room always has exactly one worker.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, RoomQueue>>,
    transport: Arc<dyn VoiceTransport>,
    timing: PlaybackTiming,
}

impl RoomRegistry {
    pub fn new(transport: Arc<dyn VoiceTransport>, timing: PlaybackTiming) -> Arc<Self> {
        Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            transport,
            timing,
        })
    }

    pub fn transport(&self) -> &Arc<dyn VoiceTransport> {
        &self.transport
    }

    pub fn timing(&self) -> PlaybackTiming {
        self.timing
    }

    /// Schedule a request for its room.
    ///
    /// Starts a worker if the room is idle, queues the request if there is
    /// room, and drops it otherwise. Never waits on voice I/O.
    pub async fn enqueue(self: &Arc<Self>, request: PlayRequest) -> EnqueueOutcome {
        let room = request.room_id;
        let mut rooms = self.rooms.lock().await;

        if let Some(queue) = rooms.get_mut(&room) {
            return match queue.try_push(request) {
                Ok(position) => {
                    debug!(guild_id = room, position, "Queued play");
                    EnqueueOutcome::Queued { position }
                }
                Err(dropped) => {
                    info!(guild_id = room, clips = %dropped.describe(), "Queue full, dropping play");
                    EnqueueOutcome::Dropped
                }
            };
        }

        rooms.insert(room, RoomQueue::new(MAX_QUEUE));
        self.spawn_worker(request);
        EnqueueOutcome::Started
    }

    fn spawn_worker(self: &Arc<Self>, request: PlayRequest) {
        let room = request.room_id;
        let worker = PlaybackWorker::new(self.clone(), room);
        let handle = tokio::spawn(worker.run(request));

        // A panicking worker must not leave its room live forever.
        let registry = self.clone();
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                error!(guild_id = room, error = %e, "Playback worker failed");
                if let Err(e) = registry.transport.leave(room).await {
                    warn!(guild_id = room, error = %e, "Failed to leave after worker failure");
                }
                registry.rooms.lock().await.remove(&room);
            }
        });
    }

    /// Take the next queued request for a room.
    pub(crate) async fn pop(&self, room: RoomId) -> Option<PlayRequest> {
        self.rooms.lock().await.get_mut(&room)?.pop()
    }

    /// Take the next queued request, or retire the room if none is left.
    pub(crate) async fn pop_or_remove(&self, room: RoomId) -> Option<PlayRequest> {
        let mut rooms = self.rooms.lock().await;
        let queue = rooms.get_mut(&room)?;
        if queue.is_empty() {
            rooms.remove(&room);
            debug!(guild_id = room, "Room retired");
            return None;
        }
        queue.pop()
    }

    /// Whether a worker currently owns the room.
    pub async fn is_live(&self, room: RoomId) -> bool {
        self.rooms.lock().await.contains_key(&room)
    }

    /// Number of requests waiting in a live room.
    pub async fn queue_len(&self, room: RoomId) -> Option<usize> {
        self.rooms.lock().await.get(&room).map(RoomQueue::len)
    }

    /// Number of rooms with a live worker.
    pub async fn live_rooms(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("timing", &self.timing)
            .finish()
    }
}
