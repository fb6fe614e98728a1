//! Fan-out of match updates to WebSocket subscribers.

use kalah_rules::MatchId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, instrument};

/// Frames buffered per match before slow subscribers start skipping.
const CHANNEL_CAPACITY: usize = 64;

/// Per-match broadcast channels carrying serialized envelopes.
///
/// Separate from [`crate::MatchLocks`]: subscribing never waits on a move.
#[derive(Debug, Clone, Default)]
pub struct MatchHub {
    channels: Arc<Mutex<HashMap<MatchId, broadcast::Sender<String>>>>,
}

impl MatchHub {
    /// Creates a hub with no channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to frames published for `match_id`.
    ///
    /// Dropping the returned [`Subscription`] frees the channel once nobody
    /// else listens.
    #[instrument(skip(self))]
    pub fn subscribe(&self, match_id: &str) -> Subscription {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = channels
            .entry(match_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        debug!(subscribers = sender.receiver_count() + 1, "Subscribed");
        Subscription {
            receiver: Some(sender.subscribe()),
            hub: self.clone(),
            match_id: match_id.to_string(),
        }
    }

    /// Drops the channel for `match_id` if it has no receivers left.
    /// Returns whether a channel was removed.
    #[instrument(skip(self))]
    pub fn prune(&self, match_id: &str) -> bool {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = channels
            .get(match_id)
            .is_some_and(|sender| sender.receiver_count() == 0);
        if idle {
            channels.remove(match_id);
            debug!("Dropped idle channel");
        }
        idle
    }

    /// Sends `frame` to every subscriber of `match_id`, returning how many
    /// received it. Channels without subscribers are dropped.
    #[instrument(skip(self, frame))]
    pub fn publish(&self, match_id: &str, frame: String) -> usize {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = channels.get(match_id) else {
            return 0;
        };
        match sender.send(frame) {
            Ok(delivered) => {
                debug!(delivered, "Published match update");
                delivered
            }
            Err(_) => {
                channels.remove(match_id);
                debug!("No subscribers left, dropped channel");
                0
            }
        }
    }

    /// Number of matches with an open channel.
    pub fn channel_count(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A receiver of one match's frames.
#[derive(Debug)]
pub struct Subscription {
    receiver: Option<broadcast::Receiver<String>>,
    hub: MatchHub,
    match_id: MatchId,
}

impl Subscription {
    /// Waits for the next frame.
    ///
    /// # Errors
    ///
    /// [`RecvError::Lagged`] when frames were skipped, [`RecvError::Closed`]
    /// once the channel is gone.
    pub async fn recv(&mut self) -> Result<String, RecvError> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => Err(RecvError::Closed),
        }
    }

    /// Returns a frame if one is already queued.
    ///
    /// # Errors
    ///
    /// [`TryRecvError::Empty`] when nothing is queued.
    pub fn try_recv(&mut self) -> Result<String, TryRecvError> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.try_recv(),
            None => Err(TryRecvError::Closed),
        }
    }

    /// Match this subscription follows.
    pub fn match_id(&self) -> &str {
        &self.match_id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The receiver must be gone before the count is checked.
        drop(self.receiver.take());
        self.hub.prune(&self.match_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_of_a_match_all_receive() {
        let hub = MatchHub::new();
        let mut first = hub.subscribe("m1");
        let mut second = hub.subscribe("m1");
        let mut other = hub.subscribe("m2");

        assert_eq!(hub.publish("m1", "update".to_string()), 2);
        assert_eq!(first.recv().await.expect("frame"), "update");
        assert_eq!(second.recv().await.expect("frame"), "update");
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_a_no_op() {
        let hub = MatchHub::new();
        assert_eq!(hub.publish("nobody", "x".to_string()), 0);
        assert_eq!(hub.channel_count(), 0);
    }

    #[test]
    fn channel_is_freed_when_last_subscriber_drops() {
        let hub = MatchHub::new();
        for i in 0..1000 {
            drop(hub.subscribe(&format!("ghost-{i}")));
        }
        assert_eq!(hub.channel_count(), 0);

        let first = hub.subscribe("m1");
        let second = hub.subscribe("m1");
        drop(first);
        assert_eq!(hub.channel_count(), 1);
        drop(second);
        assert_eq!(hub.channel_count(), 0);
    }

    #[test]
    fn prune_keeps_channels_with_listeners() {
        let hub = MatchHub::new();
        let _listener = hub.subscribe("m1");
        assert!(!hub.prune("m1"));
        assert!(!hub.prune("unknown"));
        assert_eq!(hub.channel_count(), 1);
    }
}
