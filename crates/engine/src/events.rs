//! Event bus feeding the cache.
//!
//! Network, metadata and history layers publish [`CacheEvent`]s; each
//! subscriber gets its own channel. Events from one publisher arrive in the
//! order they were published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};

use viewgrid_protocol::CacheEvent;

type Senders = Vec<(u64, mpsc::Sender<CacheEvent>)>;

#[derive(Clone)]
pub struct EventBus {
    /// Subscription id → sender.
    senders: Arc<Mutex<Senders>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            senders: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn senders(&self) -> MutexGuard<'_, Senders> {
        // A panicking subscriber can't leave the list half-updated.
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel();
        self.senders().push((id, tx));
        Subscription {
            id,
            receiver: rx,
            bus: self.clone(),
        }
    }

    fn unregister(&self, id: u64) {
        self.senders().retain(|(sub_id, _)| *sub_id != id);
    }

    /// Send to every live subscriber. Returns how many received the event.
    pub fn publish(&self, event: CacheEvent) -> usize {
        let mut senders = self.senders();
        senders.retain(|(id, tx)| match tx.send(event.clone()) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("dropping closed subscription {id}");
                false
            }
        });
        senders.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Receiving end of a bus subscription. Detaches on drop.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<CacheEvent>,
    bus: EventBus,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next pending event, without blocking.
    pub fn try_next(&self) -> Option<CacheEvent> {
        self.receiver.try_recv().ok()
    }

    /// All pending events, in order.
    pub fn drain(&self) -> impl Iterator<Item = CacheEvent> + '_ {
        self.receiver.try_iter()
    }

    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unregister(self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
