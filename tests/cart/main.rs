//! Integration tests for the cart store, its persistence, and provider wiring.

mod persistence;

use cart_store::{
    AddOutcome, CartConfig, CartItem, CartProvider, CartStore, InMemoryKeyValueStore,
    KeyValueStore, PersistenceGateway, ProductRef, RecoveryPolicy,
};
use std::sync::Arc;
use support::KEY;

fn open(store: &InMemoryKeyValueStore) -> CartStore {
    let gateway = PersistenceGateway::new(Arc::new(store.clone()), KEY);
    CartStore::open(gateway, RecoveryPolicy::Strict).unwrap()
}

fn shirt() -> ProductRef {
    ProductRef::new("p1", "Shirt", "u", 10.0)
}

#[test]
fn shopping_session() {
    let kv = InMemoryKeyValueStore::new();
    let cart = open(&kv);

    // empty cart, first add
    assert_eq!(cart.add_to_cart(shirt()).unwrap(), AddOutcome::Inserted);
    assert_eq!(
        cart.products(),
        vec![CartItem {
            id: "p1".into(),
            title: "Shirt".into(),
            image_url: "u".into(),
            price: 10.0,
            quantity: 1,
        }]
    );

    // increment
    cart.increment("p1");
    assert_eq!(cart.get("p1").unwrap().quantity, 2);

    // decrement twice: 1, then gone
    cart.decrement("p1");
    assert_eq!(cart.get("p1").unwrap().quantity, 1);
    cart.decrement("p1");
    assert!(cart.products().is_empty());

    cart.flush();
    assert_eq!(kv.get(KEY).unwrap().as_deref(), Some("[]"));
}

#[test]
fn adding_same_product_twice_merges() {
    let cart = open(&InMemoryKeyValueStore::new());

    cart.add_to_cart(shirt()).unwrap();
    assert_eq!(cart.add_to_cart(shirt()).unwrap(), AddOutcome::Merged);

    let products = cart.products();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].quantity, 2);
}

#[test]
fn insertion_order_is_kept() {
    let cart = open(&InMemoryKeyValueStore::new());
    for (id, title) in [("a", "Apple"), ("b", "Banana"), ("c", "Cherry")] {
        cart.add_to_cart(ProductRef::new(id, title, "", 1.0)).unwrap();
    }

    cart.increment("a");
    cart.add_to_cart(ProductRef::new("b", "Banana", "", 1.0)).unwrap();
    cart.decrement("a");
    cart.decrement("a");

    let ids: Vec<String> = cart.products().into_iter().map(|item| item.id).collect();
    assert_eq!(ids, vec!["b", "c"]);
}

#[test]
fn snapshots_are_detached_copies() {
    let cart = open(&InMemoryKeyValueStore::new());
    cart.add_to_cart(shirt()).unwrap();

    let mut snapshot = cart.products();
    snapshot[0].quantity = 99;
    snapshot.clear();

    assert_eq!(cart.get("p1").unwrap().quantity, 1);
}

#[test]
fn cart_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = CartConfig {
        storage_path: Some(dir.path().join("storage.json")),
        ..CartConfig::default()
    };

    {
        let context = CartProvider::open(&config).unwrap();
        let cart = context.use_cart().unwrap();
        cart.add_to_cart(shirt()).unwrap();
        cart.add_to_cart(ProductRef::new("p2", "Mug", "m", 4.5)).unwrap();
        cart.increment("p2");
        let stats = cart.shutdown();
        assert_eq!(stats.failures, 0);
    }

    let context = CartProvider::open(&config).unwrap();
    let products = context.use_cart().unwrap().products();

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].id, "p1");
    assert_eq!(products[1].id, "p2");
    assert_eq!(products[1].quantity, 2);
    assert_eq!(products[1].price, 4.5);
}
