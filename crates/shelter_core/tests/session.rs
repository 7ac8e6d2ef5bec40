use serde_json::json;
use shelter_core::{
    connect, ConnectionError, ConnectionTarget, Credentials, MemoryStore, Namespace, RetryPolicy,
    Session, ShelterRepository, StoreError,
};
use std::cell::Cell;
use std::time::Duration;

fn namespace() -> Namespace {
    Namespace::new("aac", "animals")
}

#[test]
fn authentication_failure_yields_connection_error_and_releases_store() {
    let store = MemoryStore::new();
    store.reject_credentials(true);

    let result = Session::establish(store.clone(), namespace());

    match result {
        Err(ConnectionError::Probe(StoreError::Unauthorized(_))) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("session must not be produced"),
    }
    assert_eq!(store.release_count(), 1);
}

#[test]
fn unreachable_store_yields_connection_error() {
    let store = MemoryStore::new();
    store.set_outage(true);

    let err = Session::establish(store, namespace())
        .err()
        .expect("probe must fail");
    assert!(err.is_transient());
    assert!(err.to_string().contains("liveness probe failed"));
}

#[test]
fn established_session_is_immediately_usable() {
    let session = Session::establish(MemoryStore::new(), namespace()).unwrap();
    assert_eq!(session.namespace(), &namespace());

    let repo = ShelterRepository::new(session);
    assert_eq!(repo.create(json!({"name": "Luna"})), Ok(true));
}

#[test]
fn establish_with_retries_transient_probe_failures() {
    let store = MemoryStore::new();
    store.set_outage(true);
    let attempts = Cell::new(0);

    let session = Session::establish_with(
        || {
            attempts.set(attempts.get() + 1);
            if attempts.get() == 3 {
                store.set_outage(false);
            }
            Ok(store.clone())
        },
        namespace(),
        &RetryPolicy::exponential(4, Duration::ZERO),
    )
    .unwrap();

    assert_eq!(attempts.get(), 3);
    assert_eq!(session.namespace(), &namespace());
    // Two failed probes released their handles.
    assert_eq!(store.release_count(), 2);
}

#[test]
fn establish_with_does_not_retry_rejected_credentials() {
    let store = MemoryStore::new();
    store.reject_credentials(true);
    let attempts = Cell::new(0);

    let result = Session::establish_with(
        || {
            attempts.set(attempts.get() + 1);
            Ok(store.clone())
        },
        namespace(),
        &RetryPolicy::exponential(5, Duration::ZERO),
    );

    assert!(matches!(result, Err(ConnectionError::Probe(StoreError::Unauthorized(_)))));
    assert_eq!(attempts.get(), 1);
}

#[test]
fn connect_rejects_invalid_target_before_network_io() {
    let credentials = Credentials::new("aacuser", "secret");
    let target = ConnectionTarget::new("localhost", 27017, "bad/name", "animals");

    let err = connect(&credentials, &target).err().expect("target must be rejected");
    assert!(matches!(err, ConnectionError::InvalidTarget(_)));
}

#[test]
fn connect_to_unreachable_mongodb_fails_without_session() {
    let credentials = Credentials::new("aacuser", "p@ss:word");
    let target = ConnectionTarget::new("127.0.0.1", 1, "aac", "animals")
        .with_server_selection_timeout(Duration::from_millis(200));

    let err = connect(&credentials, &target)
        .err()
        .expect("unreachable server must fail");
    assert!(matches!(err, ConnectionError::Probe(_) | ConnectionError::Open(_)));
}
