//! Model mirroring and input aggregation observed through the facade.

mod common;

use serde_json::json;

use common::Harness;
use stagelink_client::{InteractivityState, ParticipantState};
use stagelink_ports::HttpMethod;
use stagelink_protocol::Frame;

const HOSTS_BODY: &str = r#"[{"address":"wss://host.test/gameplay"}]"#;

/// Connected, initialized with one button scene, interactivity enabled, one
/// participant (user 7 on session "s1") joined.
async fn enabled_harness() -> Harness {
    let mut h = Harness::new();
    h.storage
        .preload("A-V", r#"{"auth_token":"Bearer T","refresh_token":"R"}"#);
    h.http
        .on(HttpMethod::Get, "/interactive/hosts", &[(200, HOSTS_BODY)]);
    h.http
        .on(HttpMethod::Get, "host.test/gameplay", &[(400, "")]);
    h.client.initialize(true).unwrap();
    h.pump().await;

    h.socket.emit_method("hello", json!({}));
    h.pump().await;
    let frames = h.sent_frames();
    h.socket.emit_reply(
        Harness::frame_id(&frames[0]),
        json!({"groups": [{"groupID": "default", "sceneID": "default", "etag": "1"}]}),
    );
    h.socket.emit_reply(
        Harness::frame_id(&frames[1]),
        json!({"scenes": [{
            "sceneID": "default",
            "etag": "1",
            "controls": [{"controlID": "b", "kind": "button", "cost": 1, "etag": "1"}]
        }]}),
    );
    h.pump().await;

    // initialize(true) auto-sends ready; the service confirms.
    h.socket.emit_method("onReady", json!({"isReady": true}));
    h.pump().await;
    assert_eq!(
        h.client.interactivity_state(),
        InteractivityState::InteractivityEnabled
    );

    h.socket.emit_method(
        "onParticipantJoin",
        json!({"participants": [{"sessionID": "s1", "userID": 7, "username": "ada"}]}),
    );
    h.pump().await;
    h
}

#[tokio::test]
async fn test_participant_join_then_leave_keeps_last_known_entry() {
    let mut h = enabled_harness().await;
    h.socket.emit_method(
        "onParticipantLeave",
        json!({"participants": [{"sessionID": "s1", "userID": 7, "username": "ada"}]}),
    );
    h.pump().await;

    {
        let recorded = h.recorded();
        let changes: Vec<(u32, ParticipantState)> = recorded
            .participants
            .iter()
            .map(|(p, s)| (p.user_id, *s))
            .collect();
        assert_eq!(
            changes,
            vec![(7, ParticipantState::Joined), (7, ParticipantState::Left)]
        );
    }

    let participants = h.client.participants();
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].user_id, 7);
    assert_eq!(participants[0].state, ParticipantState::Left);
    assert_eq!(participants[0].username, "ada");
}

#[tokio::test]
async fn test_button_edge_lasts_exactly_one_tick() {
    let mut h = enabled_harness().await;
    h.socket.emit_method(
        "giveInput",
        json!({
            "participantID": "s1",
            "input": {"controlID": "b", "event": "mousedown"}
        }),
    );
    Harness::settle().await;

    // The tick that drains the input observes the edge.
    h.client.do_work();
    assert!(h.client.button_down("b", 7));
    assert!(h.client.button_pressed("b", 7));
    assert!(h.client.any_button_down("b"));
    assert_eq!(h.client.count_of_button_downs("b", 7), 1);

    // The next tick with no input rolls it away.
    h.client.do_work();
    assert!(!h.client.button_down("b", 7));
    assert!(!h.client.button_pressed("b", 7));
    assert_eq!(h.client.count_of_button_presses("b", 7), 0);
}

#[tokio::test]
async fn test_button_event_carries_transaction() {
    let mut h = enabled_harness().await;
    h.socket.emit_method(
        "giveInput",
        json!({
            "participantID": "s1",
            "transactionID": "t-99",
            "input": {"controlID": "b", "event": "mousedown"}
        }),
    );
    h.pump().await;

    let recorded = h.recorded();
    let button = recorded.buttons.last().expect("button event");
    assert_eq!(button.user_id, 7);
    assert_eq!(button.transaction_id.as_deref(), Some("t-99"));
    drop(recorded);

    // Capturing the transaction sends one `capture` frame.
    let before = h.sent_frames().len();
    h.client.capture_transaction("t-99");
    h.pump().await;
    let frames = h.sent_frames();
    assert_eq!(frames.len(), before + 1);
    let capture = frames.last().unwrap();
    assert_eq!(capture["method"], "capture");
    assert_eq!(capture["params"]["transactionID"], "t-99");
}

#[tokio::test]
async fn test_joystick_moves_average_in_float_domain() {
    let mut h = enabled_harness().await;
    for (x, y) in [(1.0, 0.0), (0.0, 1.0)] {
        h.socket.emit_method(
            "giveInput",
            json!({
                "participantID": "s1",
                "input": {"controlID": "j", "event": "move", "x": x, "y": y}
            }),
        );
    }
    h.pump().await;

    assert!((h.client.joystick_x("j", 7) - 0.5).abs() < 1e-9);
    assert!((h.client.joystick_y("j", 7) - 0.5).abs() < 1e-9);
    assert_eq!(h.recorded().joysticks.len(), 2);
}

#[tokio::test]
async fn test_trigger_cooldown_sends_exactly_one_update() {
    let mut h = enabled_harness().await;
    let before_frames = h.sent_frames().len();
    let before_ms = chrono::Utc::now().timestamp_millis();
    h.client.trigger_cooldown("b", 5000).unwrap();
    let after_ms = chrono::Utc::now().timestamp_millis();
    h.pump().await;

    let stamped = h
        .client
        .buttons()
        .into_iter()
        .find(|b| b.control_id == "b")
        .unwrap();
    assert!(stamped.cooldown_expiration_ms >= before_ms + 5000);
    assert!(stamped.cooldown_expiration_ms <= after_ms + 5000);

    let frames = h.sent_frames();
    let updates: Vec<_> = frames[before_frames..]
        .iter()
        .filter(|f| f["method"] == "updateControls")
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0]["params"]["controls"][0]["cooldown"],
        stamped.cooldown_expiration_ms
    );
}

#[tokio::test]
async fn test_send_message_round_trips_through_codec() {
    let mut h = enabled_harness().await;
    let params = json!({"a": [1, 2, 3], "nested": {"b": "c"}});
    h.client.send_message("myCustomMethod", params.clone());
    h.pump().await;

    let text = h.socket.sent().last().unwrap().clone();
    let frame = stagelink_protocol::read_frame(&text).unwrap();
    match frame {
        Frame::Method(m) => {
            assert_eq!(m.method, "myCustomMethod");
            assert_eq!(m.params, params);
        }
        _ => panic!("expected method frame"),
    }
}

#[tokio::test]
async fn test_reply_error_reaches_error_callback() {
    let mut h = enabled_harness().await;
    h.client.set_current_scene("lobby", None);
    h.pump().await;

    let frames = h.sent_frames();
    let scene_frame = frames
        .iter()
        .find(|f| f["method"] == "setCurrentScene")
        .unwrap();
    h.socket
        .emit_reply_error(Harness::frame_id(scene_frame), 4010, "unknown scene");
    h.pump().await;

    assert!(h
        .recorded()
        .errors
        .iter()
        .any(|e| e.code == 4010 && e.message.contains("unknown scene")));
}

#[tokio::test]
async fn test_start_interactive_before_init_is_misuse() {
    let mut h = Harness::new();
    h.http
        .on(HttpMethod::Get, "/interactive/hosts", &[(200, HOSTS_BODY)]);
    h.http.on(
        HttpMethod::Post,
        "/oauth/shortcode",
        &[(200, r#"{"code":"C","expires_in":60,"handle":"H"}"#)],
    );
    h.client.initialize(false).unwrap();
    h.pump().await;

    h.client.start_interactive();
    h.client.do_work();

    assert!(h
        .recorded()
        .errors
        .iter()
        .any(|e| e.kind == stagelink_client::ErrorKind::MisuseError));
}
