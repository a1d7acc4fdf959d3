//! Topic-based message bus abstraction.
//!
//! The back-end publishes and subscribes through a [`MessageBus`] handle and
//! never sees the underlying fabric. [`LocalBus`] is the in-process
//! implementation used by tests and single-host deployments; the UDP
//! transport layers on top of it for routing.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::Mutex;

/// A topic-tagged payload.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Destination topic.
    pub topic: String,
    /// Encoded message bytes.
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Create an envelope.
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}

/// Publish/subscribe fabric seam.
///
/// Publishers are also delivered their own messages on topics they subscribe
/// to, matching the loopback semantics of the fleet's transport.
pub trait MessageBus: Send + Sync {
    /// Publish an envelope to its topic.
    fn publish(&self, envelope: Envelope);

    /// Subscribe to a topic, receiving every envelope published to it.
    fn subscribe(&self, topic: &str) -> Receiver<Envelope>;
}

/// In-process bus delivering over crossbeam channels.
#[derive(Default)]
pub struct LocalBus {
    subscribers: Mutex<HashMap<String, Vec<Sender<Envelope>>>>,
}

impl LocalBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageBus for LocalBus {
    fn publish(&self, envelope: Envelope) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(senders) = subscribers.get_mut(&envelope.topic) {
            // Drop subscribers whose receiving end is gone.
            senders.retain(|tx| tx.send(envelope.clone()).is_ok());
        }
    }

    fn subscribe(&self, topic: &str) -> Receiver<Envelope> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_subscriber() {
        let bus = LocalBus::new();
        let rx = bus.subscribe("/topic");
        bus.publish(Envelope::new("/topic", vec![1, 2, 3]));
        assert_eq!(rx.recv().unwrap().payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus = LocalBus::new();
        let rx = bus.subscribe("/a");
        bus.publish(Envelope::new("/b", vec![0]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_fan_out() {
        let bus = LocalBus::new();
        let rx1 = bus.subscribe("/t");
        let rx2 = bus.subscribe("/t");
        bus.publish(Envelope::new("/t", vec![7]));
        assert_eq!(rx1.recv().unwrap().payload, vec![7]);
        assert_eq!(rx2.recv().unwrap().payload, vec![7]);
    }

    #[test]
    fn test_dropped_subscriber_pruned() {
        let bus = LocalBus::new();
        drop(bus.subscribe("/t"));
        // Does not error; the dead sender is removed on publish.
        bus.publish(Envelope::new("/t", vec![0]));
        let rx = bus.subscribe("/t");
        bus.publish(Envelope::new("/t", vec![9]));
        assert_eq!(rx.recv().unwrap().payload, vec![9]);
    }
}
