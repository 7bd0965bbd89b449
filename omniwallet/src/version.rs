//! Monotonic state version shared by all plugins of a context.
//!
//! Every externally significant mutation bumps the counter; UI layers watch
//! it and re-read their snapshot instead of observing individual fields.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::trace;

/// Value the counter starts at.
pub const INITIAL_VERSION: u64 = 1;

/// Strictly increasing version counter.
#[derive(Debug)]
pub struct VersionCounter {
    value: AtomicU64,
    tx: watch::Sender<u64>,
}

impl VersionCounter {
    /// Create a counter starting at [`INITIAL_VERSION`].
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(INITIAL_VERSION);
        Self {
            value: AtomicU64::new(INITIAL_VERSION),
            tx,
        }
    }

    /// Current version.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Increase by one and return the new version.
    pub fn incr(&self) -> u64 {
        self.incr_by(1)
    }

    /// Increase by `delta` and return the new version.
    ///
    /// A zero delta leaves the counter unchanged and notifies nobody.
    pub fn incr_by(&self, delta: u64) -> u64 {
        let previous = self
            .value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.saturating_add(delta))
            })
            .unwrap_or_else(|v| v);
        let next = previous.saturating_add(delta);
        if delta > 0 {
            // Watchers may lag behind a burst of bumps; they only need the latest value.
            self.tx.send_if_modified(|current| {
                if next > *current {
                    *current = next;
                    true
                } else {
                    false
                }
            });
            trace!(version = next, "version bumped");
        }
        next
    }

    /// Watch the counter.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for VersionCounter {
    fn default() -> Self {
        Self::new()
    }
}
