use crate::support::{FlakyStore, SlowRecordingStore, UnreadableStore, KEY};
use cart_store::{
    Cart, CartError, CartStore, InMemoryKeyValueStore, KeyValueStore, PersistenceGateway,
    ProductRef, RecoveryPolicy,
};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

fn product(id: &str) -> ProductRef {
    ProductRef::new(id, format!("Product {}", id), format!("https://img/{}.png", id), 9.9)
}

fn stored_cart(store: &dyn KeyValueStore) -> Cart {
    serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap()
}

#[test]
fn failed_write_keeps_memory_state() {
    let kv = FlakyStore::new();
    let cart = CartStore::open(
        PersistenceGateway::new(Arc::new(kv.clone()), KEY),
        RecoveryPolicy::Strict,
    )
    .unwrap();

    cart.add_to_cart(product("p1")).unwrap();
    cart.flush();

    kv.set_failing(true);
    cart.increment("p1");
    cart.flush();

    assert_eq!(cart.get("p1").unwrap().quantity, 2);
    assert_eq!(stored_cart(kv.inner()).get("p1").unwrap().quantity, 1);

    let stats = cart.writer_stats();
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.failures, 1);
    assert!(stats.last_error.unwrap().contains("quota exceeded"));

    // the next successful write carries the full snapshot again
    kv.set_failing(false);
    cart.add_to_cart(product("p2")).unwrap();
    cart.flush();

    assert_eq!(stored_cart(kv.inner()), cart.cart());
}

#[test]
fn failure_listener_is_told() {
    let kv = FlakyStore::new();
    kv.set_failing(true);
    let cart = CartStore::open(
        PersistenceGateway::new(Arc::new(kv.clone()), KEY),
        RecoveryPolicy::Strict,
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    cart.events().on_failed(move |notice| {
        let _ = tx.lock().unwrap().send(notice);
    });

    cart.add_to_cart(product("p1")).unwrap();

    let notice = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(notice.revision, 1);
    assert_eq!(notice.key, KEY);
    assert!(notice.message.contains("quota exceeded"));
}

#[test]
fn persisted_listener_is_told() {
    let kv = InMemoryKeyValueStore::new();
    let cart = CartStore::open(
        PersistenceGateway::new(Arc::new(kv.clone()), KEY),
        RecoveryPolicy::Strict,
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    cart.events().on_persisted(move |notice| {
        let _ = tx.lock().unwrap().send(notice);
    });

    cart.add_to_cart(product("p1")).unwrap();

    let notice = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(notice.revision, 1);
    assert_eq!(notice.items, 1);
}

#[test]
fn slow_store_never_regresses() {
    let kv = SlowRecordingStore::new(Duration::from_millis(20));
    let cart = CartStore::open(
        PersistenceGateway::new(Arc::new(kv.clone()), KEY),
        RecoveryPolicy::Strict,
    )
    .unwrap();

    cart.add_to_cart(product("p1")).unwrap();
    for _ in 0..30 {
        cart.increment("p1");
    }
    let stats = cart.shutdown();

    assert_eq!(stored_cart(kv.inner()).get("p1").unwrap().quantity, 31);
    assert!(stats.coalesced > 0);
    assert_eq!(stats.writes + stats.coalesced, 31);

    // every write that did happen moved forward
    let quantities: Vec<u32> = kv
        .writes()
        .iter()
        .map(|raw| {
            let cart: Cart = serde_json::from_str(raw).unwrap();
            cart.get("p1").unwrap().quantity
        })
        .collect();
    assert!(quantities.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn malformed_stored_value_strict() {
    let kv = InMemoryKeyValueStore::with_entry(KEY, "[{\"id\":");
    let gateway = PersistenceGateway::new(Arc::new(kv), KEY);

    let err = CartStore::open(gateway, RecoveryPolicy::Strict).err().unwrap();
    assert!(matches!(err, CartError::Deserialization { .. }));
}

#[test]
fn malformed_stored_value_reset() {
    let kv = InMemoryKeyValueStore::with_entry(KEY, "definitely not a cart");
    let gateway = PersistenceGateway::new(Arc::new(kv.clone()), KEY);

    let cart = CartStore::open(gateway, RecoveryPolicy::ResetOnCorrupt).unwrap();
    assert!(cart.is_empty());

    // the corrupt value is only replaced by the next mutation
    assert_eq!(
        kv.get(KEY).unwrap().as_deref(),
        Some("definitely not a cart")
    );
    cart.add_to_cart(product("p1")).unwrap();
    cart.flush();
    assert_eq!(stored_cart(&kv).len(), 1);
}

#[test]
fn invalid_cart_shape_is_rejected() {
    let kv = InMemoryKeyValueStore::with_entry(
        KEY,
        r#"[{"id":"p1","title":"a","image_url":"","price":1,"quantity":0}]"#,
    );
    let gateway = PersistenceGateway::new(Arc::new(kv), KEY);

    assert!(matches!(
        gateway.load(),
        Err(CartError::Deserialization { .. })
    ));
}

#[test]
fn unencodable_price_never_reaches_storage() {
    let kv = InMemoryKeyValueStore::new();
    let cart = CartStore::open(
        PersistenceGateway::new(Arc::new(kv.clone()), KEY),
        RecoveryPolicy::Strict,
    )
    .unwrap();

    for price in [f64::INFINITY, f64::NAN] {
        let err = cart.add_to_cart(ProductRef::new("p1", "Shirt", "u", price)).unwrap_err();
        assert!(matches!(err, CartError::InvalidProduct(_)));
    }
    assert!(cart.is_empty());
    assert_eq!(cart.revision(), 0);

    cart.add_to_cart(product("p2")).unwrap();
    cart.shutdown();

    let reopened = CartStore::open(
        PersistenceGateway::new(Arc::new(kv), KEY),
        RecoveryPolicy::Strict,
    )
    .unwrap();
    let ids: Vec<String> = reopened.products().into_iter().map(|item| item.id).collect();
    assert_eq!(ids, vec!["p2".to_string()]);
}

#[test]
fn read_failure_is_not_treated_as_corruption() {
    let gateway = PersistenceGateway::new(Arc::new(UnreadableStore), KEY);

    let err = CartStore::open(gateway, RecoveryPolicy::ResetOnCorrupt)
        .err()
        .unwrap();
    assert!(matches!(err, CartError::PersistenceRead { .. }));
}

#[test]
fn round_trip_preserves_order_and_fields() {
    let kv = InMemoryKeyValueStore::new();
    let gateway = PersistenceGateway::new(Arc::new(kv), KEY);

    let mut cart = Cart::new();
    for id in ["z", "a", "m"] {
        cart.add(product(id)).unwrap();
    }
    cart.increment("a");
    cart.increment("a");

    gateway.save(&cart).unwrap();
    let loaded = gateway.load().unwrap();

    assert_eq!(loaded, cart);
    let ids: Vec<&str> = loaded.items().iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["z", "a", "m"]);
}
