//! Fan-out to a dynamic set of listeners
//!
//! Each listener owns the receiving half of an unbounded channel. Sending
//! never waits on a listener, so a slow socket cannot stall the producer or
//! its peers. A listener whose receiver is gone is pruned on the next send or
//! subscribe.

use tokio::sync::mpsc;

/// Observer list with lazy pruning
#[derive(Debug)]
pub struct Broadcaster<T> {
    listeners: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Default for Broadcaster<T> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<T: Clone> Broadcaster<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Dropping the receiver unsubscribes it.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<T> {
        self.listeners.retain(|listener| !listener.is_closed());
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    /// Deliver `message` to every live listener, dropping dead ones.
    ///
    /// Returns the number of listeners reached.
    pub fn send(&mut self, message: &T) -> usize {
        self.listeners
            .retain(|listener| listener.send(message.clone()).is_ok());
        self.listeners.len()
    }

    /// Listeners registered (dead ones are counted until the next send or subscribe)
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listener_receives_in_order() {
        let mut hub = Broadcaster::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.send(&"one"), 2);
        assert_eq!(hub.send(&"two"), 2);

        assert_eq!(a.try_recv().unwrap(), "one");
        assert_eq!(a.try_recv().unwrap(), "two");
        assert_eq!(b.try_recv().unwrap(), "one");
        assert_eq!(b.try_recv().unwrap(), "two");
    }

    #[test]
    fn test_dropped_listener_pruned_lazily() {
        let mut hub = Broadcaster::new();
        let mut live = hub.subscribe();
        let dead = hub.subscribe();
        drop(dead);

        assert_eq!(hub.len(), 2);
        assert_eq!(hub.send(&1), 1);
        assert_eq!(hub.len(), 1);
        assert_eq!(live.try_recv().unwrap(), 1);
    }

    #[test]
    fn test_subscribe_prunes_dropped_listeners() {
        let mut hub: Broadcaster<u32> = Broadcaster::new();
        for _ in 0..5 {
            drop(hub.subscribe());
        }
        // Only the most recent dead listener is still counted
        assert_eq!(hub.len(), 1);

        let _live = hub.subscribe();
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_unread_listener_does_not_block() {
        let mut hub = Broadcaster::new();
        let _slow = hub.subscribe();
        let mut fast = hub.subscribe();

        for i in 0..10_000 {
            hub.send(&i);
        }
        assert_eq!(fast.try_recv().unwrap(), 0);
    }

    #[test]
    fn test_send_without_listeners() {
        let mut hub: Broadcaster<String> = Broadcaster::default();
        assert!(hub.is_empty());
        assert_eq!(hub.send(&"x".to_string()), 0);
    }
}
