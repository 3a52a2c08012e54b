//! Observer Fan-out
//!
//! Every observer gets its own bounded queue. Delivery never waits: an
//! observer whose queue is full or whose receiver is gone is dropped, and
//! everyone else keeps receiving in emission order.

use office_events::SimEvent;
use tokio::sync::mpsc;

/// Default per-observer queue length
pub const OBSERVER_QUEUE: usize = 1024;

struct Observer {
    id: u64,
    tx: mpsc::Sender<SimEvent>,
}

/// Broadcast hub owned by the simulation loop
pub struct EventHub {
    observers: Vec<Observer>,
    next_id: u64,
    capacity: usize,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            observers: Vec::new(),
            next_id: 0,
            capacity: capacity.max(1),
        }
    }

    /// Registers an observer. `initial` (the current `WorldInit`) is queued
    /// ahead of any later event.
    pub fn subscribe(&mut self, initial: Option<SimEvent>) -> mpsc::Receiver<SimEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        if let Some(event) = initial {
            let _ = tx.try_send(event);
        }
        self.next_id += 1;
        tracing::debug!(observer = self.next_id, "observer attached");
        self.observers.push(Observer {
            id: self.next_id,
            tx,
        });
        rx
    }

    /// Delivers one event to every observer, pruning the ones that fail
    pub fn publish(&mut self, event: &SimEvent) {
        self.observers.retain(|observer| match observer.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(observer = observer.id, "observer fell behind, dropping it");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(observer = observer.id, "observer disconnected");
                false
            }
        });
    }

    pub fn publish_all(&mut self, events: &[SimEvent]) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(OBSERVER_QUEUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use office_events::SimStatus;

    fn status(tick: u64) -> SimEvent {
        SimEvent::Status {
            tick,
            status: SimStatus::Running,
            tick_interval_ms: None,
        }
    }

    #[test]
    fn test_initial_event_comes_first() {
        let mut hub = EventHub::new(4);
        let mut rx = hub.subscribe(Some(status(0)));
        hub.publish(&status(1));
        assert_eq!(rx.try_recv().unwrap().tick(), 0);
        assert_eq!(rx.try_recv().unwrap().tick(), 1);
    }

    #[test]
    fn test_slow_observer_is_pruned_without_blocking_others() {
        let mut hub = EventHub::new(2);
        let _slow = hub.subscribe(None);
        let mut fast = hub.subscribe(None);

        for tick in 0..5 {
            hub.publish(&status(tick));
            assert_eq!(fast.try_recv().unwrap().tick(), tick);
        }
        assert_eq!(hub.observer_count(), 1);
    }

    #[test]
    fn test_closed_observer_is_pruned() {
        let mut hub = EventHub::default();
        let rx = hub.subscribe(None);
        drop(rx);
        hub.publish(&status(1));
        assert_eq!(hub.observer_count(), 0);
    }
}
