//! Bounded FIFO of pending play requests for one room.

use super::PlayRequest;
use std::collections::VecDeque;

/// Fixed-capacity request queue.
///
/// Only the room registry touches queues, always under its lock, so a
/// capacity check and the push that follows it cannot interleave with
/// another caller.
#[derive(Debug)]
pub struct RoomQueue {
    items: VecDeque<PlayRequest>,
    capacity: usize,
}

impl RoomQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a request, returning its 1-based position, or hand it back if
    /// the queue is full.
    pub fn try_push(&mut self, request: PlayRequest) -> Result<usize, PlayRequest> {
        if self.is_full() {
            return Err(request);
        }
        self.items.push_back(request);
        Ok(self.items.len())
    }

    /// Take the oldest request.
    pub fn pop(&mut self) -> Option<PlayRequest> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Clip;
    use std::sync::Arc;

    fn request(channel: u64) -> PlayRequest {
        let clip = Arc::new(Clip::new("test", "clip", Vec::new()));
        PlayRequest::new(1, channel, vec![clip]).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = RoomQueue::new(3);
        assert_eq!(queue.try_push(request(10)).unwrap(), 1);
        assert_eq!(queue.try_push(request(20)).unwrap(), 2);

        assert_eq!(queue.pop().unwrap().channel_id, 10);
        assert_eq!(queue.pop().unwrap().channel_id, 20);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_rejects_when_full() {
        let mut queue = RoomQueue::new(2);
        queue.try_push(request(1)).unwrap();
        queue.try_push(request(2)).unwrap();
        assert!(queue.is_full());

        let rejected = queue.try_push(request(3)).unwrap_err();
        assert_eq!(rejected.channel_id, 3);
        assert_eq!(queue.len(), 2);

        queue.pop();
        assert_eq!(queue.try_push(request(4)).unwrap(), 2);
    }
}
