use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;

use crate::item::CartItem;

/// Handle returned by [`CartStore::subscribe`](super::CartStore::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&[CartItem]) + Send + Sync>;

/// Snapshots waiting to be handed to listeners, oldest first.
#[derive(Default)]
struct Delivery {
    pending: VecDeque<Vec<CartItem>>,
    draining: bool,
}

/// Synchronous change listeners, called in registration order.
///
/// Snapshots are queued with [`enqueue`](Self::enqueue) while the store lock
/// is held and handed out by [`deliver`](Self::deliver) after it is released.
/// Only one thread drains at a time, so listeners see snapshots in the order
/// they were queued even when several threads mutate at once.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    delivery: Mutex<Delivery>,
}

impl Subscribers {
    pub(crate) fn add<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&[CartItem]) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Queue a snapshot for delivery. Callers hold the store lock, which fixes
    /// the queue order to the mutation order.
    pub(crate) fn enqueue(&self, items: Vec<CartItem>) {
        self.delivery().pending.push_back(items);
    }

    /// Hand every queued snapshot to the listeners, oldest first.
    ///
    /// Returns at once if another thread is already draining; that thread
    /// picks up whatever this caller queued. A listener that mutates the store
    /// lands here re-entrantly and its snapshot is delivered after the current
    /// one has reached every listener.
    pub(crate) fn deliver(&self) {
        {
            let mut delivery = self.delivery();
            if delivery.draining {
                return;
            }
            delivery.draining = true;
        }
        let _reset = ResetOnPanic(self);

        loop {
            let items = {
                let mut delivery = self.delivery();
                match delivery.pending.pop_front() {
                    Some(items) => items,
                    None => {
                        delivery.draining = false;
                        return;
                    }
                }
            };
            self.notify(&items);
        }
    }

    /// Call every listener with `items`. The table is copied first so a
    /// listener may subscribe or unsubscribe while being notified.
    fn notify(&self, items: &[CartItem]) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(items);
        }
    }

    fn delivery(&self) -> MutexGuard<'_, Delivery> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// A panicking listener must not leave `draining` set with no thread draining.
struct ResetOnPanic<'a>(&'a Subscribers);

impl Drop for ResetOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.delivery().draining = false;
        }
    }
}
