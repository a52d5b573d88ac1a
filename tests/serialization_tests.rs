mod common;

use common::*;
use entity_proxy::{
    EntityRef, Identifier, ObjectRef, ProxyReconstructor, ProxyRegistry, SerializableProxy,
    SessionImplementor, Value,
};
use std::sync::Arc;

#[test]
fn test_surrogate_round_trip_never_fetches() {
    let session = session_with_user(42, "X");
    let factory = user_factory();
    let proxy = factory.create_proxy(42, Some(session.clone())).unwrap();

    let Value::Json(json) = proxy.invoke("writeReplace", vec![]).unwrap() else {
        panic!("uninitialized proxy must be replaced by its surrogate");
    };
    let surrogate = SerializableProxy::from_json_value(json).unwrap();
    assert_eq!(surrogate.entity_name(), USER);
    assert_eq!(surrogate.persistent_class(), USER);
    assert_eq!(surrogate.identifier(), &Identifier::Integer(42));
    assert_eq!(surrogate.identifier_accessor().getter(), Some("getId"));
    assert!(surrogate.reenter_uninitialized());

    let registry = ProxyRegistry::new();
    registry.register(factory).unwrap();
    let restored = registry
        .reconstruct(&surrogate, Some(session.clone()))
        .unwrap();

    assert!(!restored.is_initialized());
    assert_eq!(restored.invoke("getId", vec![]).unwrap(), Value::Integer(42));
    assert_eq!(session.load_count(), 0);
    assert_ne!(restored, proxy);
}

#[test]
fn test_surrogate_survives_binary_encoding() {
    let proxy = user_factory().create_proxy("user-7", None).unwrap();
    let bytes = proxy.write_replace().to_bytes().unwrap();
    let decoded = SerializableProxy::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, proxy.write_replace());
    assert_eq!(decoded.identifier(), &Identifier::from("user-7"));
}

#[test]
fn test_initialized_proxy_is_replaced_by_its_target() {
    let session = session_with_user(5, "Katherine");
    let proxy = user_factory().create_proxy(5, Some(session.clone())).unwrap();
    proxy.invoke("getName", vec![]).unwrap();

    let replacement = proxy.invoke("writeReplace", vec![]).unwrap();
    let Value::Object(ObjectRef::Entity(entity)) = replacement else {
        panic!("initialized proxy must be replaced by its target");
    };
    assert!(entity_proxy::reflect::same_instance(&entity, &proxy.target().unwrap()));
}

#[test]
fn test_write_replace_adopts_instance_already_in_session() {
    let session = session_with_user(6, "Mary");
    let loaded: EntityRef = Arc::new(User::new(6, "Mary"));
    session.attach(USER, 6, loaded.clone());
    let proxy = user_factory().create_proxy(6, Some(session.clone())).unwrap();

    let replacement = proxy.invoke("writeReplace", vec![]).unwrap();
    assert!(replacement.is_instance(&loaded));
    assert!(proxy.is_initialized());
    assert_eq!(session.load_count(), 0);
    assert_eq!(proxy.invoke("getName", vec![]).unwrap(), Value::from("Mary"));
    assert_eq!(session.load_count(), 0);
}

#[test]
fn test_closed_session_is_not_consulted_on_write_replace() {
    let session = session_with_user(8, "Jean");
    session.attach(USER, 8, Arc::new(User::new(8, "Jean")));
    session.close();
    let proxy = user_factory().create_proxy(8, Some(session.clone())).unwrap();

    assert!(matches!(
        proxy.invoke("writeReplace", vec![]).unwrap(),
        Value::Json(_)
    ));
    assert!(!proxy.is_initialized());
}

#[test]
fn test_snapshot_can_preserve_initialization() {
    let session = session_with_user(4, "Annie");
    let factory = user_factory();
    let proxy = factory.create_proxy(4, Some(session.clone())).unwrap();

    assert!(proxy.snapshot(true).reenter_uninitialized());
    proxy.initialize().unwrap();
    assert!(proxy.write_replace().reenter_uninitialized());
    let surrogate = proxy.snapshot(true);
    assert!(!surrogate.reenter_uninitialized());

    let registry = ProxyRegistry::new();
    registry.register(factory).unwrap();
    let reader: Arc<dyn SessionImplementor> = session.clone();
    let json = surrogate.to_json().unwrap();
    let restored = registry
        .reconstruct(&SerializableProxy::from_json(&json).unwrap(), Some(reader))
        .unwrap();
    assert!(restored.is_initialized());
    assert_eq!(restored.invoke("getName", vec![]).unwrap(), Value::from("Annie"));
    assert_eq!(session.load_count(), 2);
}
