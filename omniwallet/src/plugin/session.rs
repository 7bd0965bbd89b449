//! Connected sessions.
//!
//! A session is opened when a plugin becomes connected and closed when it
//! leaves that state. It owns every native listener registration and the
//! task that feeds translated native events back into the plugin, so
//! releasing it removes all of them exactly once.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::family::{NativeEvent, NativeSink};
use super::{PluginInner, WalletPlugin};
use crate::error::{Result, WalletError};
use crate::host::Host;
use crate::provider::{EventEmitter, NativeListenerId};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// One native listener registration, removed when released or dropped.
pub struct Subscription {
    label: String,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.release.is_some())
            .finish()
    }
}

impl Subscription {
    /// Wrap an arbitrary release action.
    pub fn new(label: impl Into<String>, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            release: Some(Box::new(release)),
        }
    }

    /// A listener registered with `emitter.on(event, ..)`.
    pub fn native<E>(emitter: Arc<E>, event: &str, id: NativeListenerId) -> Self
    where
        E: EventEmitter + ?Sized + 'static,
    {
        let name = event.to_string();
        Self::new(format!("native:{event}"), move || {
            emitter.remove_listener(&name, id);
        })
    }

    /// A host `message` listener.
    pub fn message(host: Arc<dyn Host>, id: NativeListenerId) -> Self {
        Self::new("host:message", move || host.remove_message_listener(id))
    }

    /// Label used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the registration is still in place.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Remove the registration. Later calls do nothing.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Native listeners plus the pump task of a connected plugin.
pub(crate) struct Session {
    id: u64,
    wallet: String,
    subscriptions: Vec<Subscription>,
    closed: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("wallet", &self.wallet)
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Subscribe the plugin's strategy and start draining its events.
    pub(crate) fn open(plugin: &WalletPlugin) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| WalletError::Config(format!("no async runtime for native events: {e}")))?;

        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let wallet = plugin.name().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = NativeSink::new(&wallet, tx);

        let account = plugin.account();
        let cx = plugin.provider_context(&account);
        let subscriptions = plugin.inner.family.subscribe(&cx, &sink)?;

        let closed = Arc::new(AtomicBool::new(false));
        let pump = runtime.spawn(pump(
            Arc::downgrade(&plugin.inner),
            rx,
            Arc::clone(&closed),
        ));

        debug!(
            wallet = %wallet,
            session = id,
            subscriptions = subscriptions.len(),
            "session opened"
        );
        Ok(Self {
            id,
            wallet,
            subscriptions,
            closed,
            pump: Some(pump),
        })
    }

    pub(crate) const fn id(&self) -> u64 {
        self.id
    }

    /// Release every subscription and stop the pump.
    pub(crate) fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for subscription in &mut self.subscriptions {
            subscription.release();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        debug!(wallet = %self.wallet, session = self.id, "session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn pump(
    plugin: Weak<PluginInner>,
    mut rx: mpsc::UnboundedReceiver<NativeEvent>,
    closed: Arc<AtomicBool>,
) {
    while let Some(event) = rx.recv().await {
        // A close issued by the previous event must win over queued ones.
        if closed.load(Ordering::SeqCst) {
            break;
        }
        let Some(inner) = plugin.upgrade() else {
            break;
        };
        let plugin = WalletPlugin { inner };
        debug!(wallet = %plugin.name(), ?event, "native event");
        if let Err(e) = plugin.handle_native_event(event).await {
            warn!(wallet = %plugin.name(), error = %e, "native event handler failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_subscription_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let mut sub = Subscription::new("test", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(sub.is_active());
        sub.release();
        sub.release();
        drop(sub);

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_released_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        {
            let sub = Subscription::new("test", move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(sub.label(), "test");
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
