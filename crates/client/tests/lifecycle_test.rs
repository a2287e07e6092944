//! Connection and authentication lifecycle, driven end to end through the
//! facade with scripted ports.

mod common;

use std::time::Duration;

use serde_json::json;

use common::Harness;
use stagelink_client::InteractivityState;
use stagelink_ports::{HttpMethod, SocketPort, StorageProvider};

const HOSTS_BODY: &str = r#"[{"address":"wss://host.test/gameplay"}]"#;

#[tokio::test]
async fn test_cold_start_with_short_code() {
    let mut h = Harness::new();
    h.http
        .on(HttpMethod::Get, "/interactive/hosts", &[(200, HOSTS_BODY)]);
    h.http.on(
        HttpMethod::Post,
        "/oauth/shortcode",
        &[(200, r#"{"code":"CODE","expires_in":120,"handle":"H"}"#)],
    );
    h.http.on(
        HttpMethod::Get,
        "/oauth/shortcode/check/H",
        &[(204, ""), (200, r#"{"code":"EX"}"#)],
    );
    h.http.on(
        HttpMethod::Post,
        "/oauth/token",
        &[(200, r#"{"access_token":"T","refresh_token":"R"}"#)],
    );

    h.client.initialize(false).unwrap();
    h.pump().await;

    // A short code is outstanding and the 500 ms poll is armed.
    assert_eq!(
        h.client.short_code(),
        Some(("CODE".to_string(), 120))
    );
    assert_eq!(
        h.client.interactivity_state(),
        InteractivityState::ShortCodeRequired
    );
    assert_eq!(
        h.timers.interval_of("check_auth_status"),
        Some(Duration::from_millis(500))
    );
    assert_eq!(
        h.timers.interval_of("refresh_short_code"),
        Some(Duration::from_secs(120))
    );
    {
        let recorded = h.recorded();
        assert_eq!(recorded.short_codes, vec![("CODE".to_string(), 120)]);
        assert!(recorded
            .states
            .contains(&InteractivityState::ShortCodeRequired));
    }

    // First poll: not approved yet, nothing happens.
    h.timers.fire("check_auth_status");
    h.pump().await;
    assert!(h.socket.opens().is_empty());

    // Second poll: approved. Exchange runs, tokens persist, socket opens.
    h.timers.fire("check_auth_status");
    h.pump().await;

    let stored = h.storage.load("A-V").expect("tokens persisted");
    assert!(stored.contains("Bearer T"));
    assert!(stored.contains("\"R\""));
    assert!(!h.timers.is_running("check_auth_status"));
    assert!(!h.timers.is_running("refresh_short_code"));

    let opens = h.socket.opens();
    assert_eq!(opens.len(), 1);
    assert_eq!(opens[0].url, "wss://host.test/gameplay");
    let header = |name: &str| {
        opens[0]
            .headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(header("Authorization").as_deref(), Some("Bearer T"));
    assert_eq!(header("X-Interactive-Version").as_deref(), Some("V"));
    assert_eq!(header("X-Protocol-Version").as_deref(), Some("2.0"));

    // hello -> exactly getGroups + getScenes.
    h.socket.emit_method("hello", json!({}));
    h.pump().await;
    let frames = h.sent_frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["method"], "getGroups");
    assert_eq!(frames[1]["method"], "getScenes");

    // Bulk replies complete initialization.
    h.socket.emit_reply(
        Harness::frame_id(&frames[0]),
        json!({"groups": [{"groupID": "default", "sceneID": "default", "etag": "1"}]}),
    );
    h.socket.emit_reply(
        Harness::frame_id(&frames[1]),
        json!({"scenes": [{"sceneID": "default", "etag": "1"}]}),
    );
    h.pump().await;

    assert_eq!(
        h.client.interactivity_state(),
        InteractivityState::Initialized
    );
    assert!(h.recorded().states.contains(&InteractivityState::Initialized));
}

#[tokio::test]
async fn test_cached_token_verifies_and_connects_on_400() {
    let mut h = Harness::new();
    h.storage
        .preload("A-V", r#"{"auth_token":"Bearer T","refresh_token":"R"}"#);
    h.http
        .on(HttpMethod::Get, "/interactive/hosts", &[(200, HOSTS_BODY)]);
    // A plain GET against the websocket endpoint answers 400: token valid.
    h.http
        .on(HttpMethod::Get, "host.test/gameplay", &[(400, "")]);

    h.client.initialize(false).unwrap();
    h.pump().await;

    assert_eq!(h.http.count_matching("/oauth/"), 0);
    let opens = h.socket.opens();
    assert_eq!(opens.len(), 1);
    assert!(opens[0]
        .headers
        .iter()
        .any(|(n, v)| n == "Authorization" && v == "Bearer T"));
}

#[tokio::test]
async fn test_cached_token_401_refreshes_then_connects() {
    let mut h = Harness::new();
    h.storage
        .preload("A-V", r#"{"auth_token":"Bearer T","refresh_token":"R"}"#);
    h.http
        .on(HttpMethod::Get, "/interactive/hosts", &[(200, HOSTS_BODY)]);
    h.http.on(
        HttpMethod::Get,
        "host.test/gameplay",
        &[(401, ""), (400, "")],
    );
    h.http.on(
        HttpMethod::Post,
        "/oauth/token",
        &[(200, r#"{"access_token":"T2","refresh_token":"R2"}"#)],
    );

    h.client.initialize(false).unwrap();
    h.pump().await;

    // Refresh grant used, new pair persisted, socket opened with it.
    let refresh = h
        .http
        .requests()
        .into_iter()
        .find(|r| r.url.contains("/oauth/token"))
        .expect("refresh request");
    assert_eq!(refresh.body.unwrap()["grant_type"], "refresh_token");

    assert!(h.storage.load("A-V").unwrap().contains("Bearer T2"));
    let opens = h.socket.opens();
    assert_eq!(opens.len(), 1);
    assert!(opens[0]
        .headers
        .iter()
        .any(|(n, v)| n == "Authorization" && v == "Bearer T2"));
}

#[tokio::test]
async fn test_dispose_stops_timers_and_closes_socket() {
    let mut h = Harness::new();
    h.storage
        .preload("A-V", r#"{"auth_token":"Bearer T","refresh_token":"R"}"#);
    h.http
        .on(HttpMethod::Get, "/interactive/hosts", &[(200, HOSTS_BODY)]);
    h.http
        .on(HttpMethod::Get, "host.test/gameplay", &[(400, "")]);
    h.client.initialize(false).unwrap();
    h.pump().await;
    assert!(h.socket.is_open());

    h.client.dispose();
    Harness::settle().await;

    assert!(!h.timers.is_running("check_auth_status"));
    assert!(!h.timers.is_running("reconnect"));
    assert_eq!(h.socket.closes(), vec!["interactive client disposed"]);

    // The pump is inert after dispose: a close event changes nothing.
    h.socket.emit(stagelink_ports::SocketEvent::Closed {
        code: 1006,
        reason: String::new(),
    });
    h.pump().await;
    assert!(!h.timers.is_running("reconnect"));
}

#[tokio::test]
async fn test_missing_config_fails_synchronously() {
    use std::sync::Arc;
    use stagelink_adapters::testing::{
        ManualTimers, MemoryStorage, RecordingSocketPort, ScriptedHttpPort,
    };
    use stagelink_client::{ClientConfig, ClientPorts, InteractiveClient};

    let ports = ClientPorts {
        http: Arc::new(ScriptedHttpPort::new()),
        socket: Arc::new(RecordingSocketPort::new()),
        storage: Arc::new(MemoryStorage::new()),
        timers: Arc::new(ManualTimers::new()),
    };
    let result = InteractiveClient::new(
        ClientConfig::new("A", ""),
        ports,
        tokio::runtime::Handle::current(),
    );
    assert!(result.is_err());
}
