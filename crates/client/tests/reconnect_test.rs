//! Close handling: backoff-with-verification for ordinary closes, fatal
//! surfacing for the reserved close codes.

mod common;

use std::time::Duration;

use common::Harness;
use stagelink_client::{ErrorKind, InteractivityState};
use stagelink_ports::{HttpMethod, SocketEvent, SocketPort};

const HOSTS_BODY: &str = r#"[{"address":"wss://host.test/gameplay"}]"#;

/// Cached-token connect, so the verify endpoint is already scripted for
/// the reconnect path.
async fn open_harness() -> Harness {
    let mut h = Harness::new();
    h.storage
        .preload("A-V", r#"{"auth_token":"Bearer T","refresh_token":"R"}"#);
    h.http
        .on(HttpMethod::Get, "/interactive/hosts", &[(200, HOSTS_BODY)]);
    h.http
        .on(HttpMethod::Get, "host.test/gameplay", &[(400, "")]);
    h.client.initialize(false).unwrap();
    h.pump().await;
    assert_eq!(h.socket.opens().len(), 1);
    h
}

#[tokio::test]
async fn test_ordinary_close_backs_off_and_reverifies() {
    let mut h = open_harness().await;
    let verifies_before = h.http.count_matching("host.test/gameplay");

    h.socket.emit(SocketEvent::Closed {
        code: 1006,
        reason: "abnormal".to_string(),
    });
    h.pump().await;

    assert_eq!(
        h.client.interactivity_state(),
        InteractivityState::InteractivityDisabled
    );
    assert_eq!(
        h.timers.interval_of("reconnect"),
        Some(Duration::from_millis(500))
    );

    // The reconnect fire verifies the token rather than blindly re-opening.
    h.timers.fire("reconnect");
    h.pump().await;

    assert_eq!(
        h.http.count_matching("host.test/gameplay"),
        verifies_before + 1
    );
    assert_eq!(h.socket.opens().len(), 2);
    // Once re-opened, the reconnect timer is stopped.
    assert!(!h.timers.is_running("reconnect"));
}

#[tokio::test]
async fn test_fatal_close_4020_surfaces_and_stays_down() {
    let mut h = open_harness().await;
    h.socket.emit(SocketEvent::Closed {
        code: 4020,
        reason: String::new(),
    });
    h.pump().await;

    let recorded = h.recorded();
    let error = recorded
        .errors
        .iter()
        .find(|e| e.kind == ErrorKind::ProjectInaccessible)
        .expect("fatal close error");
    assert_eq!(error.code, 4020);
    assert!(error.message.contains("4020"));
    assert!(error.message.contains("access"));
    drop(recorded);

    assert!(!h.timers.is_running("reconnect"));
    assert_eq!(h.socket.opens().len(), 1);
}

#[tokio::test]
async fn test_duplicate_session_close_is_fatal() {
    let mut h = open_harness().await;
    h.socket.emit(SocketEvent::Closed {
        code: 4021,
        reason: String::new(),
    });
    h.pump().await;

    assert!(h
        .recorded()
        .errors
        .iter()
        .any(|e| e.kind == ErrorKind::DuplicateSession && e.code == 4021));
    assert!(!h.timers.is_running("reconnect"));
}

#[tokio::test]
async fn test_failed_open_retries_through_backoff() {
    let mut h = Harness::new();
    h.storage
        .preload("A-V", r#"{"auth_token":"Bearer T","refresh_token":"R"}"#);
    h.http
        .on(HttpMethod::Get, "/interactive/hosts", &[(200, HOSTS_BODY)]);
    h.http
        .on(HttpMethod::Get, "host.test/gameplay", &[(400, "")]);
    h.socket.fail_next_open("connection refused");

    h.client.initialize(false).unwrap();
    h.pump().await;

    assert!(h
        .recorded()
        .errors
        .iter()
        .any(|e| e.kind == ErrorKind::TransportBroken));
    assert!(h.timers.is_running("reconnect"));

    h.timers.fire("reconnect");
    h.pump().await;
    assert_eq!(h.socket.opens().len(), 2);
    assert!(h.socket.is_open());
}
