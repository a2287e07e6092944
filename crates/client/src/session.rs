//! Protocol session
//!
//! Dispatches server pushes, correlates replies through the outstanding
//! message table, and gates initialization on the first `getGroups` +
//! `getScenes` pair. All model and input mutation funnels through here, on
//! the consumer thread.

use std::collections::HashMap;

use serde_json::{json, Value};

use stagelink_protocol::methods::client as rpc;
use stagelink_protocol::{
    input_events, read_frame, write_frame, ControlData, Frame, GiveInputParams, GroupData,
    MethodFrame, ParticipantData, ReplyFrame, SceneData, ServerMethod,
};

use crate::actions::Action;
use crate::error::{ErrorEvent, ErrorKind};
use crate::events::{ButtonEvent, InteractiveEvent, InteractivityState, JoystickEvent};
use crate::input::InputAggregator;
use crate::mirror::WorldMirror;

/// How a participant payload entered the client.
enum ParticipantChange {
    Join,
    Leave,
    Update,
}

pub(crate) struct ProtocolSession {
    current_message_id: u32,
    /// id -> method, written before the frame enters the transport, cleared
    /// when the matching reply is processed.
    outstanding: HashMap<u32, String>,
    initialized_groups: bool,
    initialized_scenes: bool,
    should_start_interactive: bool,
    state: InteractivityState,
}

impl ProtocolSession {
    pub fn new() -> Self {
        Self {
            current_message_id: 0,
            outstanding: HashMap::new(),
            initialized_groups: false,
            initialized_scenes: false,
            should_start_interactive: false,
            state: InteractivityState::NotInitialized,
        }
    }

    pub fn state(&self) -> InteractivityState {
        self.state
    }

    pub fn set_should_start(&mut self, should_start: bool) {
        self.should_start_interactive = should_start;
    }

    /// True once the first groups/scenes pair has been populated.
    pub fn is_initialized(&self) -> bool {
        !matches!(
            self.state,
            InteractivityState::NotInitialized
                | InteractivityState::Initializing
                | InteractivityState::ShortCodeRequired
        )
    }

    #[cfg(test)]
    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn set_state(&mut self, new_state: InteractivityState) -> Vec<Action> {
        if self.state == new_state {
            return Vec::new();
        }
        self.state = new_state;
        vec![Action::Emit(InteractiveEvent::InteractivityStateChanged(
            new_state,
        ))]
    }

    /// Allocate an id, record the outstanding entry, and serialize the frame.
    /// The caller hands the text to the transport immediately after.
    pub fn next_send(&mut self, method: &str, params: Value) -> (u32, String) {
        let id = self.current_message_id;
        self.current_message_id = self.current_message_id.wrapping_add(1);
        self.outstanding.insert(id, method.to_string());
        let text = write_frame(&Frame::method(id, method, params));
        (id, text)
    }

    /// The socket dropped: bulk state must be re-fetched on the next `hello`.
    pub fn on_disconnected(&mut self) {
        self.initialized_groups = false;
        self.initialized_scenes = false;
    }

    pub fn reset(&mut self) {
        self.outstanding.clear();
        self.initialized_groups = false;
        self.initialized_scenes = false;
        self.should_start_interactive = false;
        self.state = InteractivityState::NotInitialized;
    }

    pub fn handle_frame(
        &mut self,
        text: &str,
        mirror: &mut WorldMirror,
        input: &mut InputAggregator,
    ) -> Vec<Action> {
        let frame = match read_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("dropping malformed frame: {}", e);
                return vec![Action::Emit(InteractiveEvent::Error(ErrorEvent::new(
                    ErrorKind::ProtocolError,
                    format!("malformed server frame: {e}"),
                )))];
            }
        };
        match frame {
            Frame::Method(frame) => self.dispatch_method(frame, mirror, input),
            Frame::Reply(frame) => self.dispatch_reply(frame, mirror),
        }
    }

    // =========================================================================
    // Server pushes
    // =========================================================================

    fn dispatch_method(
        &mut self,
        frame: MethodFrame,
        mirror: &mut WorldMirror,
        input: &mut InputAggregator,
    ) -> Vec<Action> {
        let Some(method) = ServerMethod::from_name(&frame.method) else {
            tracing::debug!("ignoring unrecognized method {}", frame.method);
            return vec![Action::Emit(InteractiveEvent::Message {
                method: frame.method,
                params: frame.params,
            })];
        };
        match method {
            ServerMethod::Hello => vec![
                Action::send_rpc(rpc::GET_GROUPS, json!({})),
                Action::send_rpc(rpc::GET_SCENES, json!({})),
            ],
            ServerMethod::ParticipantJoin => {
                self.on_participants(&frame.params, mirror, ParticipantChange::Join)
            }
            ServerMethod::ParticipantLeave => {
                self.on_participants(&frame.params, mirror, ParticipantChange::Leave)
            }
            ServerMethod::ParticipantUpdate => {
                self.on_participants(&frame.params, mirror, ParticipantChange::Update)
            }
            ServerMethod::GroupCreate | ServerMethod::GroupUpdate => {
                for group in parse_list::<GroupData>(&frame.params, "groups") {
                    mirror.apply_group(&group);
                }
                Vec::new()
            }
            ServerMethod::SceneCreate => {
                for scene in parse_list::<SceneData>(&frame.params, "scenes") {
                    mirror.add_scene(&scene);
                }
                Vec::new()
            }
            ServerMethod::ControlUpdate => {
                let scene_id = frame.params["sceneID"].as_str().unwrap_or_default().to_string();
                let controls = parse_list::<ControlData>(&frame.params, "controls");
                mirror.update_controls(&scene_id, &controls);
                Vec::new()
            }
            ServerMethod::Ready => {
                let is_ready = frame.params["isReady"].as_bool().unwrap_or(false);
                if is_ready {
                    self.set_state(InteractivityState::InteractivityEnabled)
                } else {
                    self.set_state(InteractivityState::InteractivityDisabled)
                }
            }
            ServerMethod::GiveInput => self.on_give_input(frame.params, mirror, input),
        }
    }

    fn on_participants(
        &mut self,
        params: &Value,
        mirror: &mut WorldMirror,
        change: ParticipantChange,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        for data in parse_list::<ParticipantData>(params, "participants") {
            match change {
                ParticipantChange::Join => {
                    let participant = mirror.apply_join(&data);
                    let state = participant.state;
                    actions.push(Action::Emit(InteractiveEvent::ParticipantStateChanged {
                        participant,
                        state,
                    }));
                }
                ParticipantChange::Leave => {
                    for participant in mirror.apply_leave(&data) {
                        let state = participant.state;
                        actions.push(Action::Emit(
                            InteractiveEvent::ParticipantStateChanged { participant, state },
                        ));
                    }
                }
                ParticipantChange::Update => {
                    let participant = mirror.apply_update(&data);
                    let state = participant.state;
                    actions.push(Action::Emit(InteractiveEvent::ParticipantStateChanged {
                        participant,
                        state,
                    }));
                }
            }
        }
        actions
    }

    fn on_give_input(
        &mut self,
        params: Value,
        mirror: &mut WorldMirror,
        input: &mut InputAggregator,
    ) -> Vec<Action> {
        let give: GiveInputParams = match serde_json::from_value(params) {
            Ok(give) => give,
            Err(e) => {
                tracing::debug!("dropping unreadable giveInput: {}", e);
                return Vec::new();
            }
        };
        let Some(participant) = mirror.participant_by_session(&give.participant_id) else {
            tracing::debug!(
                "giveInput for unknown participant session {}",
                give.participant_id
            );
            return Vec::new();
        };
        let user_id = participant.user_id;
        let session_id = participant.session_id.clone();
        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        mirror.touch_input(&session_id, now_ms);

        let control_id = give.input.control_id;
        match give.input.event.as_str() {
            input_events::MOUSE_DOWN => {
                input.apply_button(user_id, &control_id, true);
                vec![Action::Emit(InteractiveEvent::Button(ButtonEvent {
                    control_id,
                    session_id,
                    user_id,
                    is_pressed: true,
                    transaction_id: give.transaction_id,
                }))]
            }
            input_events::MOUSE_UP => {
                input.apply_button(user_id, &control_id, false);
                vec![Action::Emit(InteractiveEvent::Button(ButtonEvent {
                    control_id,
                    session_id,
                    user_id,
                    is_pressed: false,
                    transaction_id: give.transaction_id,
                }))]
            }
            input_events::MOVE => {
                input.apply_joystick(user_id, &control_id, give.input.x, give.input.y);
                vec![Action::Emit(InteractiveEvent::Joystick(JoystickEvent {
                    control_id,
                    session_id,
                    user_id,
                    x: give.input.x,
                    y: give.input.y,
                }))]
            }
            other => {
                tracing::debug!("ignoring input event kind {}", other);
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Replies
    // =========================================================================

    fn dispatch_reply(&mut self, frame: ReplyFrame, mirror: &mut WorldMirror) -> Vec<Action> {
        let Some(method) = self.outstanding.remove(&frame.id) else {
            tracing::warn!("reply {} does not match any outstanding message", frame.id);
            return Vec::new();
        };
        if let Some(error) = &frame.error {
            let message = format!("{} failed: {}", method, error.composed_message());
            tracing::warn!("{}", message);
            return vec![Action::Emit(InteractiveEvent::Error(
                ErrorEvent::with_code(ErrorKind::ReplyError, error.code, message),
            ))];
        }

        match method.as_str() {
            rpc::GET_GROUPS => {
                for group in parse_list::<GroupData>(&frame.result, "groups") {
                    mirror.apply_group(&group);
                }
                self.initialized_groups = true;
                self.maybe_initialized()
            }
            rpc::GET_SCENES => {
                let scenes = parse_list::<SceneData>(&frame.result, "scenes");
                mirror.replace_scenes(&scenes);
                self.initialized_scenes = true;
                self.maybe_initialized()
            }
            rpc::GET_ALL_PARTICIPANTS => {
                let participants = parse_list::<ParticipantData>(&frame.result, "participants");
                mirror.replace_participants(&participants);
                Vec::new()
            }
            // The remaining recognized replies only matter when they carry an
            // error object, which was handled above.
            _ => Vec::new(),
        }
    }

    fn maybe_initialized(&mut self) -> Vec<Action> {
        if !(self.initialized_groups && self.initialized_scenes) {
            return Vec::new();
        }
        let mut actions = self.set_state(InteractivityState::Initialized);
        if self.should_start_interactive {
            actions.extend(self.set_state(InteractivityState::InteractivityPending));
            actions.push(Action::send_rpc(rpc::READY, json!({"isReady": true})));
        }
        actions
    }
}

/// Parse `params[key]` as a list, skipping entries that do not deserialize.
/// A missing or non-array member is treated as empty.
fn parse_list<T: serde::de::DeserializeOwned>(params: &Value, key: &str) -> Vec<T> {
    let Some(entries) = params.get(key).and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("skipping unreadable {} entry: {}", key, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParticipantState;

    fn world() -> (ProtocolSession, WorldMirror, InputAggregator) {
        (
            ProtocolSession::new(),
            WorldMirror::new(),
            InputAggregator::new(),
        )
    }

    fn push(method: &str, params: Value) -> String {
        json!({"type": "method", "method": method, "params": params}).to_string()
    }

    fn sent_methods(actions: &[Action]) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::SendRpc { method, .. } => Some(method.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_hello_requests_groups_and_scenes() {
        let (mut session, mut mirror, mut input) = world();
        let actions = session.handle_frame(&push("hello", json!({})), &mut mirror, &mut input);
        assert_eq!(sent_methods(&actions), vec!["getGroups", "getScenes"]);
    }

    #[test]
    fn test_outstanding_entry_written_then_cleared_once() {
        let (mut session, mut mirror, mut input) = world();
        let (id, text) = session.next_send(rpc::GET_GROUPS, json!({}));
        assert_eq!(session.outstanding_len(), 1);
        assert!(text.contains("\"method\":\"getGroups\""));

        let reply = json!({"type": "reply", "id": id, "result": {"groups": []}}).to_string();
        session.handle_frame(&reply, &mut mirror, &mut input);
        assert_eq!(session.outstanding_len(), 0);

        // A second reply with the same id no longer correlates.
        let actions = session.handle_frame(&reply, &mut mirror, &mut input);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_initialization_gates_on_both_bulks() {
        let (mut session, mut mirror, mut input) = world();
        let (groups_id, _) = session.next_send(rpc::GET_GROUPS, json!({}));
        let (scenes_id, _) = session.next_send(rpc::GET_SCENES, json!({}));

        let reply = json!({"type":"reply","id":groups_id,"result":{"groups":[]}}).to_string();
        let actions = session.handle_frame(&reply, &mut mirror, &mut input);
        assert!(actions.is_empty());
        assert!(!session.is_initialized());

        let reply = json!({"type":"reply","id":scenes_id,"result":{"scenes":[]}}).to_string();
        let actions = session.handle_frame(&reply, &mut mirror, &mut input);
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Emit(InteractiveEvent::InteractivityStateChanged(
                InteractivityState::Initialized
            ))
        )));
    }

    #[test]
    fn test_auto_ready_after_initialization() {
        let (mut session, mut mirror, mut input) = world();
        session.set_should_start(true);
        let (groups_id, _) = session.next_send(rpc::GET_GROUPS, json!({}));
        let (scenes_id, _) = session.next_send(rpc::GET_SCENES, json!({}));

        let reply = json!({"type":"reply","id":groups_id,"result":{"groups":[]}}).to_string();
        session.handle_frame(&reply, &mut mirror, &mut input);
        let reply = json!({"type":"reply","id":scenes_id,"result":{"scenes":[]}}).to_string();
        let actions = session.handle_frame(&reply, &mut mirror, &mut input);

        assert_eq!(sent_methods(&actions), vec!["ready"]);
        assert_eq!(session.state(), InteractivityState::InteractivityPending);
    }

    #[test]
    fn test_on_ready_flips_interactivity() {
        let (mut session, mut mirror, mut input) = world();
        let actions = session.handle_frame(
            &push("onReady", json!({"isReady": true})),
            &mut mirror,
            &mut input,
        );
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Emit(InteractiveEvent::InteractivityStateChanged(
                InteractivityState::InteractivityEnabled
            ))
        )));
        assert_eq!(session.state(), InteractivityState::InteractivityEnabled);
    }

    #[test]
    fn test_participant_join_then_leave_keeps_entry() {
        let (mut session, mut mirror, mut input) = world();
        let participant = json!({"sessionID": "s1", "userID": 42, "username": "ada"});

        let actions = session.handle_frame(
            &push("onParticipantJoin", json!({"participants": [participant]})),
            &mut mirror,
            &mut input,
        );
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Emit(InteractiveEvent::ParticipantStateChanged { state, .. })
                if *state == ParticipantState::Joined
        )));

        let actions = session.handle_frame(
            &push("onParticipantLeave", json!({"participants": [participant]})),
            &mut mirror,
            &mut input,
        );
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::Emit(InteractiveEvent::ParticipantStateChanged { state, .. })
                if *state == ParticipantState::Left
        )));
        assert_eq!(mirror.participants().len(), 1);
        assert_eq!(
            mirror.participant_by_user(42).unwrap().state,
            ParticipantState::Left
        );
    }

    #[test]
    fn test_give_input_routes_by_session_to_user() {
        let (mut session, mut mirror, mut input) = world();
        session.handle_frame(
            &push(
                "onParticipantJoin",
                json!({"participants": [{"sessionID": "s1", "userID": 7}]}),
            ),
            &mut mirror,
            &mut input,
        );

        let actions = session.handle_frame(
            &push(
                "giveInput",
                json!({
                    "participantID": "s1",
                    "transactionID": "t1",
                    "input": {"controlID": "b", "event": "mousedown"}
                }),
            ),
            &mut mirror,
            &mut input,
        );

        let button = actions
            .iter()
            .find_map(|a| match a {
                Action::Emit(InteractiveEvent::Button(b)) => Some(b.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(button.user_id, 7);
        assert!(button.is_pressed);
        assert_eq!(button.transaction_id.as_deref(), Some("t1"));

        input.shift_frame();
        assert!(input.button_down("b", 7));
    }

    #[test]
    fn test_give_input_for_unknown_session_is_dropped() {
        let (mut session, mut mirror, mut input) = world();
        let actions = session.handle_frame(
            &push(
                "giveInput",
                json!({"participantID": "ghost", "input": {"controlID": "b", "event": "mousedown"}}),
            ),
            &mut mirror,
            &mut input,
        );
        assert!(actions.is_empty());
    }

    #[test]
    fn test_reply_error_surfaces_with_code() {
        let (mut session, mut mirror, mut input) = world();
        let (id, _) = session.next_send(rpc::CAPTURE, json!({"transactionID": "t"}));
        let reply = json!({
            "type": "reply", "id": id, "result": null,
            "error": {"code": 4007, "message": "transaction expired", "path": "transactionID"}
        })
        .to_string();

        let actions = session.handle_frame(&reply, &mut mirror, &mut input);
        let error = actions
            .iter()
            .find_map(|a| match a {
                Action::Emit(InteractiveEvent::Error(e)) => Some(e.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(error.kind, ErrorKind::ReplyError);
        assert_eq!(error.code, 4007);
        assert!(error.message.contains("capture"));
        assert!(error.message.contains("transaction expired"));
        assert_eq!(session.outstanding_len(), 0);
    }

    #[test]
    fn test_unknown_method_is_surfaced_not_fatal() {
        let (mut session, mut mirror, mut input) = world();
        let actions = session.handle_frame(
            &push("onBrandNewThing", json!({"x": 1})),
            &mut mirror,
            &mut input,
        );
        assert!(matches!(
            &actions[0],
            Action::Emit(InteractiveEvent::Message { method, .. }) if method == "onBrandNewThing"
        ));
    }

    #[test]
    fn test_malformed_frame_reports_protocol_error() {
        let (mut session, mut mirror, mut input) = world();
        let actions = session.handle_frame("{\"type\":\"met", &mut mirror, &mut input);
        assert!(matches!(
            &actions[0],
            Action::Emit(InteractiveEvent::Error(e)) if e.kind == ErrorKind::ProtocolError
        ));
    }

    #[test]
    fn test_control_update_lands_in_mirror() {
        let (mut session, mut mirror, mut input) = world();
        session.handle_frame(
            &push(
                "onControlUpdate",
                json!({"sceneID": "a", "controls": [
                    {"controlID": "b1", "kind": "button", "cost": 3}
                ]}),
            ),
            &mut mirror,
            &mut input,
        );
        let button = mirror.control("b1").unwrap().as_button().unwrap().clone();
        assert_eq!(button.cost, 3);
        assert_eq!(button.scene_id, "a");
    }
}
