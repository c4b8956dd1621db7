use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::Weak;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use anyhow::Result;
use log::debug;
use log::error;
use log::warn;

use crate::event::DomainEvent;
use crate::subscriber::Subscriber;

type Callback = Arc<dyn Fn(&DomainEvent) -> Result<()> + Send + Sync>;

struct Entry {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct RegistryInner {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for RegistryInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryInner")
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl RegistryInner {
    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|e| e.id != id);
        before != entries.len()
    }
}

/// Outcome of delivering one event to a registry snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Ordered set of callbacks that receive every dispatched event.
///
/// Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<RegistryInner>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `callback` to the registry. Delivery order is registration order.
    pub fn register_callback<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&DomainEvent) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                id,
                callback: Arc::new(callback),
            });
        debug!("Registered subscription {id}.");

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
            active: AtomicBool::new(true),
        }
    }

    pub fn register_subscriber<S>(&self, subscriber: Arc<S>) -> Subscription
    where
        S: Subscriber + ?Sized + 'static,
    {
        self.register_callback(move |event| subscriber.callback(event))
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every callback registered when the call starts.
    ///
    /// Each callback runs in isolation: an `Err` or a panic is logged and
    /// counted, and the remaining callbacks still run.
    pub fn dispatch(&self, event: &DomainEvent) -> DispatchReport {
        let snapshot: Vec<(u64, Callback)> = self
            .inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| (e.id, e.callback.clone()))
            .collect();

        let mut report = DispatchReport::default();
        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(
                        "Subscription {id} failed to handle {} event: {e}",
                        event.kind()
                    );
                }
                Err(panic) => {
                    report.failed += 1;
                    error!(
                        "Subscription {id} panicked while handling {} event: {}",
                        event.kind(),
                        panic_message(panic.as_ref())
                    );
                }
            }
        }
        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// One consumer's registration. Call [`Subscription::unsubscribe`] to stop
/// receiving events; dropping the handle leaves the registration in place.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<RegistryInner>,
    active: AtomicBool,
}

impl Subscription {
    /// Removes exactly this registration. Repeated calls, or calls after the
    /// registry is gone, do nothing.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                debug!("Removed subscription {}.", self.id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.registry.strong_count() > 0
    }
}
