//! CartStore - the authoritative in-memory cart.
//!
//! Every mutation runs synchronously against memory, hands a full snapshot
//! to the [`PersistenceWriter`], and then notifies subscribers. Persistence
//! can lag or fail without ever rolling back what callers see.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cart_store::{
//!     CartStore, InMemoryKeyValueStore, PersistenceGateway, ProductRef, RecoveryPolicy,
//! };
//!
//! let kv = Arc::new(InMemoryKeyValueStore::new());
//! let gateway = PersistenceGateway::new(kv, "@Shop:cartProducts");
//! let store = CartStore::open(gateway, RecoveryPolicy::Strict)?;
//!
//! store.subscribe(|items| println!("{} lines in cart", items.len()));
//! store.add_to_cart(ProductRef::new("p1", "Shirt", "https://img/p1.png", 10.0))?;
//! store.increment("p1");
//! assert_eq!(store.get("p1").unwrap().quantity, 2);
//! ```

mod subscribers;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::error::Result;
use crate::item::{AddOutcome, Cart, CartItem, ProductRef};
use crate::persistence::{
    PersistenceEvents, PersistenceGateway, PersistenceWriter, RecoveryPolicy, WriterStats,
};

pub use subscribers::SubscriptionId;
use subscribers::Subscribers;

struct State {
    cart: Cart,
    revision: u64,
}

/// Owns the cart and keeps its persisted copy in step.
///
/// Share it behind an `Arc`; all operations take `&self`. Readers get
/// copies of the items, never references into the store.
pub struct CartStore {
    state: Mutex<State>,
    subscribers: Subscribers,
    writer: PersistenceWriter,
    events: PersistenceEvents,
}

impl CartStore {
    /// Load the stored cart through `gateway` and start the writer.
    pub fn open(gateway: PersistenceGateway, policy: RecoveryPolicy) -> Result<Self> {
        let cart = gateway.load_with(policy)?;
        Ok(Self::with_cart(cart, gateway))
    }

    /// Start from `cart` without reading storage. Nothing is written until
    /// the first mutation.
    pub fn with_cart(cart: Cart, gateway: PersistenceGateway) -> Self {
        let events = PersistenceEvents::new();
        let writer = PersistenceWriter::spawn(gateway, events.clone());
        Self {
            state: Mutex::new(State { cart, revision: 0 }),
            subscribers: Subscribers::default(),
            writer,
            events,
        }
    }

    /// Add one unit of `product`. If a line with the same id exists this is
    /// exactly [`increment`](Self::increment); otherwise a new line with
    /// quantity 1 is appended.
    ///
    /// Fails with [`CartError::InvalidProduct`](crate::CartError::InvalidProduct)
    /// when the product id is empty.
    pub fn add_to_cart(&self, product: ProductRef) -> Result<AddOutcome> {
        let id = product.id.clone();
        let mut outcome = AddOutcome::Inserted;
        self.apply("add_to_cart", &id, |cart| {
            outcome = cart.add(product)?;
            Ok(true)
        })?;
        Ok(outcome)
    }

    /// Raise the quantity of `id` by one. Returns false, without writing or
    /// notifying, when `id` is not in the cart.
    pub fn increment(&self, id: &str) -> bool {
        self.apply("increment", id, |cart| Ok(cart.increment(id))).unwrap_or(false)
    }

    /// Lower the quantity of `id` by one; the line is removed when it hits zero.
    /// Returns false, without writing or notifying, when `id` is not in the cart.
    pub fn decrement(&self, id: &str) -> bool {
        self.apply("decrement", id, |cart| Ok(cart.decrement(id))).unwrap_or(false)
    }

    /// Drop the line for `id` whatever its quantity.
    pub fn remove(&self, id: &str) -> bool {
        self.apply("remove", id, |cart| Ok(cart.remove(id).is_some())).unwrap_or(false)
    }

    /// Empty the cart.
    pub fn clear(&self) -> bool {
        self.apply("clear", "*", |cart| Ok(cart.clear())).unwrap_or(false)
    }

    /// Snapshot of the current items in cart order.
    pub fn products(&self) -> Vec<CartItem> {
        self.lock().cart.items().to_vec()
    }

    /// Snapshot of the whole cart.
    pub fn cart(&self) -> Cart {
        self.lock().cart.clone()
    }

    pub fn get(&self, id: &str) -> Option<CartItem> {
        self.lock().cart.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().cart.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().cart.is_empty()
    }

    pub fn total_quantity(&self) -> u64 {
        self.lock().cart.total_quantity()
    }

    /// Number of mutations applied since the store was opened.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Register `listener` to receive the items after every change.
    ///
    /// Listeners run synchronously after the store's lock is released, so they
    /// may read from or mutate the store. Snapshots are delivered in mutation
    /// order by one thread at a time: when several threads mutate at once, a
    /// mutation may return before its snapshot has been delivered by the
    /// thread that is already draining. A mutation made from inside a listener
    /// is delivered once the current snapshot has reached every listener.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&[CartItem]) + Send + Sync + 'static,
    {
        self.subscribers.add(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Persistence outcome notifications.
    pub fn events(&self) -> &PersistenceEvents {
        &self.events
    }

    /// Block until every mutation so far has been written (or has failed).
    pub fn flush(&self) {
        self.writer.flush();
    }

    pub fn writer_stats(&self) -> WriterStats {
        self.writer.stats()
    }

    /// Write pending changes and stop the writer. Later mutations still
    /// apply in memory but are no longer persisted.
    pub fn shutdown(&self) -> WriterStats {
        self.writer.stop()
    }

    fn apply<F>(&self, operation: &'static str, id: &str, mutation: F) -> Result<bool>
    where
        F: FnOnce(&mut Cart) -> Result<bool>,
    {
        {
            let mut state = self.lock();
            if !mutation(&mut state.cart)? {
                trace!(operation, id, "no matching item, cart unchanged");
                return Ok(false);
            }

            state.revision += 1;
            let revision = state.revision;
            debug!(
                operation,
                id,
                revision,
                items = state.cart.len(),
                "cart updated"
            );

            // enqueue under the lock so writes and notifications keep mutation order
            self.writer.enqueue(revision, state.cart.clone());
            self.subscribers.enqueue(state.cart.items().to_vec());
        }

        self.subscribers.deliver();
        Ok(true)
    }

    // Cart mutations never panic partway, so a poisoned lock still guards a valid cart.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
