mod common;

use common::*;
use entity_proxy::{
    InMemorySession, ObjectRef, ProxyError, SessionImplementor, SessionUnavailable, Value,
};
use std::sync::Arc;

#[test]
fn test_identifier_then_business_method() {
    let session = session_with_user(42, "X");
    let proxy = user_factory().create_proxy(42, Some(session.clone())).unwrap();

    assert_eq!(proxy.invoke("getId", vec![]).unwrap(), Value::Integer(42));
    assert_eq!(session.load_count(), 0);
    assert!(!proxy.is_initialized());

    assert_eq!(proxy.invoke("getName", vec![]).unwrap(), Value::from("X"));
    assert_eq!(session.load_count(), 1);
    assert!(proxy.is_initialized());
}

#[test]
fn test_target_is_fetched_once() {
    let session = session_with_user(7, "Ada");
    let proxy = user_factory().create_proxy(7, Some(session.clone())).unwrap();

    for _ in 0..5 {
        assert_eq!(proxy.call::<String>("getName", vec![]).unwrap(), "Ada");
    }
    proxy.invoke("isActive", vec![]).unwrap();
    proxy.initialize().unwrap();
    let first = proxy.target().unwrap();
    let second = proxy.target().unwrap();

    assert!(entity_proxy::reflect::same_instance(&first, &second));
    assert_eq!(session.load_count(), 1);
}

#[test]
fn test_bookkeeping_calls_never_fetch() {
    let session = session_with_user(5, "Grace");
    let proxy = user_factory().create_proxy(5, Some(session.clone())).unwrap();
    let other = user_factory().create_proxy(5, Some(session.clone())).unwrap();

    assert_eq!(proxy.invoke("getId", vec![]).unwrap(), Value::Integer(5));
    assert_eq!(
        proxy.invoke("hashCode", vec![]).unwrap(),
        Value::Integer(proxy.identity_hash() as i64)
    );
    assert_eq!(
        proxy.invoke("equals", vec![Value::from(proxy.clone())]).unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        proxy.invoke("equals", vec![Value::from(other.clone())]).unwrap(),
        Value::Boolean(false)
    );
    assert!(matches!(
        proxy.invoke("getLazyInitializer", vec![]).unwrap(),
        Value::Object(ObjectRef::Initializer(_))
    ));
    assert_eq!(proxy.invoke("getProxyKey", vec![]).unwrap(), Value::Integer(5));
    assert_eq!(
        proxy.invoke("isInitialized", vec![]).unwrap(),
        Value::Boolean(false)
    );
    assert_eq!(proxy.get_property("id").unwrap(), Value::Integer(5));
    assert!(matches!(
        proxy.invoke("writeReplace", vec![]).unwrap(),
        Value::Json(_)
    ));
    let _ = proxy.write_replace();

    assert_eq!(session.load_count(), 0);
    assert!(!proxy.is_initialized());
}

#[test]
fn test_lazy_initializer_handle_exposes_state() {
    let session = session_with_user(3, "Linus");
    let proxy = user_factory().create_proxy(3, Some(session.clone())).unwrap();

    let handle = proxy.invoke("getLazyInitializer", vec![]).unwrap();
    let Value::Object(ObjectRef::Initializer(router)) = handle else {
        panic!("expected lazy initializer handle");
    };
    assert!(Arc::ptr_eq(&router, proxy.lazy_initializer()));
    assert_eq!(router.entity_name(), USER);
    assert!(router.is_uninitialized());
    assert_eq!(router.interceptor_names(), vec!["dynamic-object"]);

    router.initialize().unwrap();
    assert!(proxy.is_initialized());
    assert_eq!(session.load_count(), 1);
}

#[test]
fn test_detached_proxy_fails_and_stays_uninitialized() {
    let session = session_with_user(11, "Barbara");
    let proxy = user_factory().create_proxy(11, Some(session.clone())).unwrap();
    proxy.lazy_initializer().lazy_state().unset_session().unwrap();

    let err = proxy.invoke("getName", vec![]).unwrap_err();
    assert!(matches!(
        err,
        ProxyError::NoSession {
            reason: SessionUnavailable::NoSession,
            ..
        }
    ));
    assert!(err.to_string().contains("User#11"));
    assert!(!proxy.is_initialized());
    assert_eq!(proxy.invoke("getId", vec![]).unwrap(), Value::Integer(11));

    // reattaching makes the proxy usable again
    proxy
        .lazy_initializer()
        .lazy_state()
        .set_session(session.clone())
        .unwrap();
    assert_eq!(proxy.invoke("getName", vec![]).unwrap(), Value::from("Barbara"));
    assert_eq!(session.load_count(), 1);
}

#[test]
fn test_closed_and_disconnected_sessions() {
    let session = session_with_user(1, "Ken");
    let proxy = user_factory().create_proxy(1, Some(session.clone())).unwrap();

    session.disconnect();
    assert!(matches!(
        proxy.invoke("getName", vec![]),
        Err(ProxyError::NoSession {
            reason: SessionUnavailable::Disconnected,
            ..
        })
    ));
    session.reconnect();
    session.close();
    assert!(matches!(
        proxy.invoke("getName", vec![]),
        Err(ProxyError::NoSession {
            reason: SessionUnavailable::Closed,
            ..
        })
    ));
    assert_eq!(session.load_count(), 0);
}

#[test]
fn test_missing_row_and_session_failure() {
    let empty = Arc::new(InMemorySession::new());
    let proxy = user_factory().create_proxy(404, Some(empty.clone())).unwrap();
    assert!(matches!(
        proxy.invoke("getName", vec![]),
        Err(ProxyError::EntityNotFound { .. })
    ));
    assert!(!proxy.is_initialized());

    let failing: Arc<dyn SessionImplementor> = Arc::new(FailingSession);
    let proxy = user_factory().create_proxy(1, Some(failing)).unwrap();
    let err = proxy.invoke("getName", vec![]).unwrap_err();
    assert!(matches!(err, ProxyError::Session(_)));
    assert_eq!(err.to_string(), "connection reset");
    assert!(!proxy.is_initialized());
}

#[test]
fn test_reentrant_fetch_is_rejected() {
    let session = Arc::new(ReentrantSession::default());
    let proxy = user_factory().create_proxy(42, Some(session.clone())).unwrap();
    session.proxy.set(proxy.clone()).unwrap();

    assert_eq!(proxy.invoke("getName", vec![]).unwrap(), Value::from("loaded"));

    let observed = session.observed.lock().unwrap();
    assert_eq!(observed[0], "Ok(Integer(42))");
    assert_eq!(observed[1], "false");
    assert!(observed[2].contains("re-entered initialization"));
}

#[test]
fn test_identifier_setter_forces_initialization() {
    let session = session_with_user(8, "Edsger");
    let proxy = user_factory().create_proxy(8, Some(session.clone())).unwrap();

    proxy.invoke("setId", vec![Value::Integer(9)]).unwrap();
    assert!(proxy.is_initialized());
    assert_eq!(session.load_count(), 1);

    // the delegate sees the change, the proxy keeps its own identifier
    assert_eq!(proxy.invoke("getId", vec![]).unwrap(), Value::Integer(9));
    assert_eq!(proxy.identifier(), &entity_proxy::Identifier::Integer(8));
}
