//! Publish-subscribe bus for domain events.
//!
//! Listeners subscribe per [`EventName`] and are invoked synchronously, in
//! subscription order, on the publishing task. Async consumers can take a
//! broadcast receiver instead and see every event.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tracing::trace;

use crate::events::{EventName, WalletEvent};

/// Default capacity for the broadcast channel.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Callback invoked for each matching event.
pub type EventListener = Arc<dyn Fn(&WalletEvent) + Send + Sync>;

/// Identifies a listener registration so it can be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event bus shared by every plugin in a wallet context.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

struct EventBusInner {
    /// Named listeners, in subscription order.
    listeners: RwLock<HashMap<EventName, Vec<(ListenerId, EventListener)>>>,
    /// Broadcast to all async subscribers.
    broadcast_tx: broadcast::Sender<WalletEvent>,
    next_id: AtomicU64,
    stats: RwLock<BusStats>,
}

/// Event bus statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusStats {
    /// Events published.
    pub published: u64,
    /// Listener invocations.
    pub delivered: u64,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a new event bus with the given broadcast capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(EventBusInner {
                listeners: RwLock::new(HashMap::new()),
                broadcast_tx,
                next_id: AtomicU64::new(1),
                stats: RwLock::new(BusStats::default()),
            }),
        }
    }

    /// Subscribe a listener to one event name.
    pub fn on<F>(&self, name: EventName, listener: F) -> ListenerId
    where
        F: Fn(&WalletEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name)
            .or_default()
            .push((id, Arc::new(listener)));
        trace!(event = %name, ?id, "listener subscribed");
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        for entries in listeners.values_mut() {
            let before = entries.len();
            entries.retain(|(existing, _)| *existing != id);
            removed |= entries.len() != before;
        }
        removed
    }

    /// Publish an event to every listener of its name and to all broadcast
    /// subscribers.
    pub fn emit_all(&self, event: &WalletEvent) {
        let name = event.name();
        // Snapshot so listeners may subscribe or unsubscribe re-entrantly.
        let targets: Vec<EventListener> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        trace!(event = %name, wallet = %event.wallet, listeners = targets.len(), "emitting");
        for listener in &targets {
            listener(event);
        }

        // No receivers is fine.
        let _ = self.inner.broadcast_tx.send(event.clone());

        let mut stats = self
            .inner
            .stats
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        stats.published += 1;
        stats.delivered += targets.len() as u64;
    }

    /// Subscribe to every event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Number of listeners registered for a name.
    #[must_use]
    pub fn listener_count(&self, name: EventName) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
            .map_or(0, Vec::len)
    }

    /// Get current bus statistics.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        *self
            .inner
            .stats
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
