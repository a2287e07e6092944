//! Public facade
//!
//! [`InteractiveClient`] is the host-constructed object owning every cache
//! and state machine; there is no global state. I/O tasks and timers only
//! feed the internal queue; [`InteractiveClient::do_work`] drains it on the
//! host's frame, runs the resulting actions, rotates the input buffers, and
//! dispatches host callbacks.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use stagelink_ports::{HttpPort, HttpRequest, SocketEvent, SocketPort, StorageProvider, TimerPort};
use stagelink_protocol::methods::client as rpc;
use stagelink_protocol::{GroupData, DEFAULT_GROUP_ID};

use crate::actions::{Action, InternalEvent, RequestTag, TimerKind};
use crate::auth::{AuthController, AuthState, CachedTokens};
use crate::config::ClientConfig;
use crate::connection::ConnectionController;
use crate::error::{ClientError, ErrorEvent, ErrorKind};
use crate::events::{ButtonEvent, InteractiveEvent, InteractivityState, JoystickEvent};
use crate::input::InputAggregator;
use crate::mirror::WorldMirror;
use crate::model::{
    ButtonControl, Control, Group, JoystickControl, Participant, ParticipantState, Scene,
};
use crate::session::ProtocolSession;

/// The capability set the client runs on. Production hosts wire the adapters
/// from `stagelink-adapters`; tests wire the doubles from its `testing`
/// module.
#[derive(Clone)]
pub struct ClientPorts {
    pub http: Arc<dyn HttpPort>,
    pub socket: Arc<dyn SocketPort>,
    pub storage: Arc<dyn StorageProvider>,
    pub timers: Arc<dyn TimerPort>,
}

#[derive(Default)]
struct Callbacks {
    on_error: Option<Box<dyn FnMut(&ErrorEvent) + Send>>,
    on_state_changed: Option<Box<dyn FnMut(InteractivityState) + Send>>,
    on_participant_changed: Option<Box<dyn FnMut(&Participant, ParticipantState) + Send>>,
    on_button: Option<Box<dyn FnMut(&ButtonEvent) + Send>>,
    on_joystick: Option<Box<dyn FnMut(&JoystickEvent) + Send>>,
    on_message: Option<Box<dyn FnMut(&str, &Value) + Send>>,
    on_short_code: Option<Box<dyn FnMut(&str, u64) + Send>>,
}

impl Callbacks {
    fn dispatch(&mut self, event: InteractiveEvent) {
        match event {
            InteractiveEvent::Error(error) => {
                if let Some(cb) = self.on_error.as_mut() {
                    cb(&error);
                }
            }
            InteractiveEvent::InteractivityStateChanged(state) => {
                if let Some(cb) = self.on_state_changed.as_mut() {
                    cb(state);
                }
            }
            InteractiveEvent::ParticipantStateChanged { participant, state } => {
                if let Some(cb) = self.on_participant_changed.as_mut() {
                    cb(&participant, state);
                }
            }
            InteractiveEvent::Button(button) => {
                if let Some(cb) = self.on_button.as_mut() {
                    cb(&button);
                }
            }
            InteractiveEvent::Joystick(joystick) => {
                if let Some(cb) = self.on_joystick.as_mut() {
                    cb(&joystick);
                }
            }
            InteractiveEvent::ShortCode {
                code,
                expires_in_secs,
            } => {
                if let Some(cb) = self.on_short_code.as_mut() {
                    cb(&code, expires_in_secs);
                }
            }
            InteractiveEvent::Message { method, params } => {
                if let Some(cb) = self.on_message.as_mut() {
                    cb(&method, &params);
                }
            }
        }
    }
}

pub struct InteractiveClient {
    config: ClientConfig,
    ports: ClientPorts,
    runtime: Handle,
    events_tx: UnboundedSender<InternalEvent>,
    events_rx: UnboundedReceiver<InternalEvent>,
    pending_host_events: Vec<InteractiveEvent>,
    auth: AuthController,
    connection: ConnectionController,
    session: ProtocolSession,
    mirror: WorldMirror,
    input: InputAggregator,
    callbacks: Callbacks,
    initialized: bool,
    disposed: bool,
}

impl InteractiveClient {
    /// Validates the configuration (the only synchronous hard failure) and
    /// wires the timer port into the internal queue.
    pub fn new(
        config: ClientConfig,
        ports: ClientPorts,
        runtime: Handle,
    ) -> Result<Self, ClientError> {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let timer_tx = events_tx.clone();
        ports.timers.bind(Arc::new(move |name| {
            if let Some(kind) = TimerKind::from_name(name) {
                let _ = timer_tx.send(InternalEvent::TimerFired(kind));
            }
        }));

        let auth = AuthController::new(&config.api_base, &config.app_id, &config.project_version_id);
        let connection = ConnectionController::new(
            &config.api_base,
            &config.project_version_id,
            config.share_code.as_deref(),
        );

        Ok(Self {
            config,
            ports,
            runtime,
            events_tx,
            events_rx,
            pending_host_events: Vec::new(),
            auth,
            connection,
            session: ProtocolSession::new(),
            mirror: WorldMirror::new(),
            input: InputAggregator::new(),
            callbacks: Callbacks::default(),
            initialized: false,
            disposed: false,
        })
    }

    /// Kick off discovery and authentication. With `start_interactive` the
    /// client sends `ready` on its own once initialization completes.
    pub fn initialize(&mut self, start_interactive: bool) -> Result<(), ClientError> {
        self.config.validate()?;
        if self.initialized {
            tracing::warn!("initialize called twice, ignoring");
            return Ok(());
        }
        self.initialized = true;
        self.session.set_should_start(start_interactive);

        let mut actions = self.session.set_state(InteractivityState::Initializing);
        actions.extend(self.connection.begin_discovery());
        let cached = self.load_cached_tokens();
        actions.extend(self.auth.bootstrap(cached));
        self.run_actions(actions);
        Ok(())
    }

    /// The per-frame pump: drain the internal queue, rotate the input
    /// buffers, dispatch host callbacks.
    pub fn do_work(&mut self) {
        if self.disposed {
            return;
        }
        while let Ok(event) = self.events_rx.try_recv() {
            self.route_event(event);
        }
        if self.session.state() == InteractivityState::InteractivityEnabled {
            self.input.shift_frame();
        }
        let events = std::mem::take(&mut self.pending_host_events);
        for event in events {
            self.callbacks.dispatch(event);
        }
    }

    /// Stops timers, closes the socket, and drops all mirrored state. The
    /// client performs no further work afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.ports.timers.stop_all();
        let socket = Arc::clone(&self.ports.socket);
        self.runtime.spawn(async move {
            socket.close("interactive client disposed").await;
        });
        self.session.reset();
        self.mirror.reset();
        self.input.clear();
    }

    // =========================================================================
    // Event routing
    // =========================================================================

    fn route_event(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::HttpCompleted {
                tag: RequestTag::DiscoverHosts,
                response,
            } => {
                let (url, mut actions) = self
                    .connection
                    .handle_discovery(response.status, &response.body);
                if let Some(url) = url {
                    actions.extend(self.auth.set_socket_url(&url));
                    // A grant that landed before discovery resolved is ready
                    // to connect now.
                    if self.auth.state() == AuthState::HaveTokens {
                        actions.push(Action::Connect);
                    }
                }
                self.run_actions(actions);
            }
            InternalEvent::HttpCompleted { tag, response } => {
                let actions = self.auth.handle_http(tag, response);
                self.run_actions(actions);
            }
            InternalEvent::HttpFailed { tag, error } => {
                let actions = match tag {
                    RequestTag::DiscoverHosts => self.connection.handle_discovery_failure(&error),
                    _ => self.auth.handle_http_failure(tag, &error),
                };
                self.run_actions(actions);
            }
            InternalEvent::TimerFired(kind) => {
                let actions = match kind {
                    TimerKind::Reconnect => self.connection.on_reconnect_timer(),
                    _ => self.auth.handle_timer(kind),
                };
                self.run_actions(actions);
            }
            InternalEvent::Socket(SocketEvent::Opened) => {
                let actions = self.connection.on_open();
                self.run_actions(actions);
            }
            InternalEvent::Socket(SocketEvent::Message(text)) => {
                let actions = self
                    .session
                    .handle_frame(&text, &mut self.mirror, &mut self.input);
                self.run_actions(actions);
            }
            InternalEvent::Socket(SocketEvent::Error(message)) => {
                tracing::error!("socket error: {}", message);
            }
            InternalEvent::Socket(SocketEvent::Closed { code, reason }) => {
                self.session.on_disconnected();
                let actions = self.connection.on_closed(code, &reason);
                self.run_actions(actions);
            }
            InternalEvent::SocketOpenFailed { error } => {
                let actions = self.connection.on_open_failed(&error);
                self.run_actions(actions);
            }
        }
    }

    /// The driver: executes actions in order, feeding cross-controller
    /// signals back into the queue.
    fn run_actions(&mut self, actions: Vec<Action>) {
        let mut queue: VecDeque<Action> = actions.into();
        while let Some(action) = queue.pop_front() {
            match action {
                Action::Http { tag, request } => self.spawn_http(tag, request),
                Action::OpenSocket { url, headers } => self.spawn_open(url, headers),
                Action::CloseSocket { reason } => {
                    let socket = Arc::clone(&self.ports.socket);
                    self.runtime.spawn(async move {
                        socket.close(&reason).await;
                    });
                }
                Action::SendRpc { method, params } => self.send_rpc(&method, params),
                Action::StartTimer { timer, interval } => {
                    self.ports.timers.start(timer.name(), interval)
                }
                Action::StopTimer { timer } => self.ports.timers.stop(timer.name()),
                Action::SaveTokens { auth, refresh } => self.save_tokens(auth, refresh),
                Action::ClearTokens => self.ports.storage.remove(&self.config.storage_key()),
                Action::SetState(state) => queue.extend(self.session.set_state(state)),
                Action::Emit(event) => self.pending_host_events.push(event),
                Action::Connect => queue.extend(self.connection.connect(self.auth.auth_header())),
                Action::VerifyToken => queue.extend(self.auth.verify_token()),
            }
        }
    }

    fn spawn_http(&self, tag: RequestTag, request: HttpRequest) {
        let http = Arc::clone(&self.ports.http);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            match http.request(request).await {
                Ok(response) => {
                    let _ = tx.send(InternalEvent::HttpCompleted { tag, response });
                }
                Err(e) => {
                    let _ = tx.send(InternalEvent::HttpFailed {
                        tag,
                        error: e.to_string(),
                    });
                }
            }
        });
    }

    fn spawn_open(&self, url: String, headers: Vec<(String, String)>) {
        let socket = Arc::clone(&self.ports.socket);
        let tx = self.events_tx.clone();
        let (socket_tx, mut socket_rx) = mpsc::unbounded_channel();
        let forward = self.events_tx.clone();
        self.runtime.spawn(async move {
            while let Some(event) = socket_rx.recv().await {
                let _ = forward.send(InternalEvent::Socket(event));
            }
        });
        self.runtime.spawn(async move {
            if let Err(e) = socket.open(&url, &headers, socket_tx).await {
                let _ = tx.send(InternalEvent::SocketOpenFailed {
                    error: e.to_string(),
                });
            }
        });
    }

    fn send_rpc(&mut self, method: &str, params: Value) {
        if !self.ports.socket.is_open() {
            tracing::warn!("socket is not open, dropping {} frame", method);
            return;
        }
        let (_id, text) = self.session.next_send(method, params);
        let socket = Arc::clone(&self.ports.socket);
        self.runtime.spawn(async move {
            if let Err(e) = socket.send(text).await {
                tracing::error!("failed to send frame: {}", e);
            }
        });
    }

    fn save_tokens(&self, auth: String, refresh: String) {
        let tokens = CachedTokens {
            auth_token: auth,
            refresh_token: refresh,
        };
        match serde_json::to_string(&tokens) {
            Ok(value) => self.ports.storage.save(&self.config.storage_key(), &value),
            Err(e) => tracing::warn!("failed to serialize tokens: {}", e),
        }
    }

    fn load_cached_tokens(&self) -> Option<CachedTokens> {
        let raw = self.ports.storage.load(&self.config.storage_key())?;
        match serde_json::from_str(&raw) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!("ignoring unreadable cached tokens: {}", e);
                None
            }
        }
    }

    // =========================================================================
    // Interactivity control
    // =========================================================================

    /// Ask the service to enable interactivity. Calling this before
    /// initialization completes is a misuse error.
    pub fn start_interactive(&mut self) {
        if !self.session.is_initialized() {
            self.pending_host_events
                .push(InteractiveEvent::Error(ErrorEvent::new(
                    ErrorKind::MisuseError,
                    "start_interactive called before initialization completed",
                )));
            return;
        }
        match self.session.state() {
            InteractivityState::InteractivityEnabled
            | InteractivityState::InteractivityPending => {}
            _ => {
                self.session.set_should_start(true);
                let mut actions = self
                    .session
                    .set_state(InteractivityState::InteractivityPending);
                actions.push(Action::send_rpc(rpc::READY, json!({"isReady": true})));
                self.run_actions(actions);
            }
        }
    }

    pub fn stop_interactive(&mut self) {
        self.session.set_should_start(false);
        if matches!(
            self.session.state(),
            InteractivityState::InteractivityEnabled | InteractivityState::InteractivityPending
        ) {
            self.run_actions(vec![Action::send_rpc(rpc::READY, json!({"isReady": false}))]);
        }
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Stamp a cooldown on a button and announce it with one `updateControls`.
    pub fn trigger_cooldown(
        &mut self,
        control_id: &str,
        cooldown_ms: i64,
    ) -> Result<(), ClientError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let params = self.mirror.trigger_cooldown(control_id, cooldown_ms, now_ms)?;
        self.run_actions(vec![Action::send_rpc(rpc::UPDATE_CONTROLS, params)]);
        Ok(())
    }

    /// Bind a group (the default group when `None`) to a scene.
    pub fn set_current_scene(&mut self, scene_id: &str, group_id: Option<&str>) {
        let group_id = group_id.unwrap_or(DEFAULT_GROUP_ID);
        self.run_actions(vec![Action::send_rpc(
            rpc::SET_CURRENT_SCENE,
            json!({"sceneID": scene_id, "groupID": group_id}),
        )]);
    }

    pub fn set_control_disabled(
        &mut self,
        control_id: &str,
        disabled: bool,
    ) -> Result<(), ClientError> {
        let params = {
            let control = self
                .mirror
                .control_mut(control_id)
                .ok_or_else(|| ClientError::UnknownControl(control_id.to_string()))?;
            control.set_disabled(disabled);
            json!({"sceneID": control.scene_id(), "controls": [control.to_data()]})
        };
        self.run_actions(vec![Action::send_rpc(rpc::UPDATE_CONTROLS, params)]);
        Ok(())
    }

    pub fn set_progress(&mut self, control_id: &str, progress: f32) -> Result<(), ClientError> {
        let params = {
            let control = self
                .mirror
                .control_mut(control_id)
                .ok_or_else(|| ClientError::UnknownControl(control_id.to_string()))?;
            let button = control
                .as_button_mut()
                .ok_or_else(|| ClientError::NotAButton(control_id.to_string()))?;
            button.progress = progress;
            let scene_id = button.scene_id.clone();
            json!({"sceneID": scene_id, "controls": [Control::Button(button.clone()).to_data()]})
        };
        self.run_actions(vec![Action::send_rpc(rpc::UPDATE_CONTROLS, params)]);
        Ok(())
    }

    /// Update a button's label and/or cost.
    pub fn set_button_properties(
        &mut self,
        control_id: &str,
        text: Option<&str>,
        cost: Option<u32>,
    ) -> Result<(), ClientError> {
        {
            let control = self
                .mirror
                .control_mut(control_id)
                .ok_or_else(|| ClientError::UnknownControl(control_id.to_string()))?;
            let button = control
                .as_button_mut()
                .ok_or_else(|| ClientError::NotAButton(control_id.to_string()))?;
            if let Some(text) = text {
                button.text = text.to_string();
            }
            if let Some(cost) = cost {
                button.cost = cost;
            }
        }
        let mut params = json!({"controlID": control_id});
        if let Some(text) = text {
            params["text"] = json!(text);
        }
        if let Some(cost) = cost {
            params["cost"] = json!(cost);
        }
        self.run_actions(vec![Action::send_rpc(
            rpc::SET_BUTTON_CONTROL_PROPERTIES,
            params,
        )]);
        Ok(())
    }

    /// Override a joystick's reported coordinates.
    pub fn set_joystick_coordinates(
        &mut self,
        control_id: &str,
        x: f64,
        y: f64,
    ) -> Result<(), ClientError> {
        if self.mirror.control(control_id).is_none() {
            return Err(ClientError::UnknownControl(control_id.to_string()));
        }
        self.run_actions(vec![Action::send_rpc(
            rpc::SET_JOYSTICK_COORDINATES,
            json!({"controlID": control_id, "x": x, "y": y}),
        )]);
        Ok(())
    }

    /// Commit a spark transaction attached to a button press.
    pub fn capture_transaction(&mut self, transaction_id: &str) {
        self.run_actions(vec![Action::send_rpc(
            rpc::CAPTURE,
            json!({"transactionID": transaction_id}),
        )]);
    }

    pub fn create_groups(&mut self, groups: &[Group]) {
        let data: Vec<GroupData> = groups.iter().map(|g| g.to_data()).collect();
        self.run_actions(vec![Action::send_rpc(
            rpc::CREATE_GROUPS,
            json!({"groups": data}),
        )]);
    }

    /// Move a participant into another group.
    pub fn update_participant_group(
        &mut self,
        user_id: u32,
        group_id: &str,
    ) -> Result<(), ClientError> {
        let mut data = self
            .mirror
            .participant_by_user(user_id)
            .ok_or(ClientError::UnknownParticipant(user_id))?
            .to_data();
        data.group_id = group_id.to_string();
        self.run_actions(vec![Action::send_rpc(
            rpc::UPDATE_PARTICIPANTS,
            json!({"participants": [data]}),
        )]);
        Ok(())
    }

    /// Advertise the compression schemes this client understands.
    pub fn set_compression(&mut self, schemes: &[&str]) {
        self.run_actions(vec![Action::send_rpc(
            rpc::SET_COMPRESSION,
            json!({"scheme": schemes}),
        )]);
    }

    /// Re-fetch the full participant list.
    pub fn request_all_participants(&mut self) {
        self.run_actions(vec![Action::send_rpc(rpc::GET_ALL_PARTICIPANTS, json!({}))]);
    }

    /// Send an arbitrary method frame. The reply is correlated like any
    /// other and surfaces errors through the error callback.
    pub fn send_message(&mut self, method: &str, params: Value) {
        self.run_actions(vec![Action::send_rpc(method, params)]);
    }

    // =========================================================================
    // Getters (snapshots)
    // =========================================================================

    pub fn interactivity_state(&self) -> InteractivityState {
        self.session.state()
    }

    /// The short code to show the user, while one is outstanding.
    pub fn short_code(&self) -> Option<(String, u64)> {
        self.auth
            .short_code()
            .map(|c| (c.code.clone(), c.expires_in_secs))
    }

    pub fn groups(&self) -> Vec<Group> {
        self.mirror.groups()
    }

    pub fn scenes(&self) -> Vec<Scene> {
        self.mirror.scenes()
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.mirror.participants()
    }

    pub fn controls(&self) -> Vec<Control> {
        self.mirror.controls()
    }

    pub fn buttons(&self) -> Vec<ButtonControl> {
        self.mirror.buttons()
    }

    pub fn joysticks(&self) -> Vec<JoystickControl> {
        self.mirror.joysticks()
    }

    pub fn group(&self, group_id: &str) -> Group {
        self.mirror.group_or_default(group_id)
    }

    /// Scene currently bound to a group; never fails (see well-known ids).
    pub fn current_scene(&self, group_id: &str) -> Scene {
        self.mirror.current_scene(group_id)
    }

    // =========================================================================
    // Input queries
    // =========================================================================

    pub fn button_down(&self, control_id: &str, user_id: u32) -> bool {
        self.input.button_down(control_id, user_id)
    }

    pub fn button_pressed(&self, control_id: &str, user_id: u32) -> bool {
        self.input.button_pressed(control_id, user_id)
    }

    pub fn button_up(&self, control_id: &str, user_id: u32) -> bool {
        self.input.button_up(control_id, user_id)
    }

    pub fn count_of_button_downs(&self, control_id: &str, user_id: u32) -> u32 {
        self.input.count_of_button_downs(control_id, user_id)
    }

    pub fn count_of_button_presses(&self, control_id: &str, user_id: u32) -> u32 {
        self.input.count_of_button_presses(control_id, user_id)
    }

    pub fn count_of_button_ups(&self, control_id: &str, user_id: u32) -> u32 {
        self.input.count_of_button_ups(control_id, user_id)
    }

    pub fn any_button_down(&self, control_id: &str) -> bool {
        self.input.any_button_down(control_id)
    }

    pub fn any_button_pressed(&self, control_id: &str) -> bool {
        self.input.any_button_pressed(control_id)
    }

    pub fn any_button_up(&self, control_id: &str) -> bool {
        self.input.any_button_up(control_id)
    }

    pub fn joystick_x(&self, control_id: &str, user_id: u32) -> f64 {
        self.input.joystick_x(control_id, user_id)
    }

    pub fn joystick_y(&self, control_id: &str, user_id: u32) -> f64 {
        self.input.joystick_y(control_id, user_id)
    }

    pub fn average_joystick_x(&self, control_id: &str) -> f64 {
        self.input.average_joystick_x(control_id)
    }

    pub fn average_joystick_y(&self, control_id: &str) -> f64 {
        self.input.average_joystick_y(control_id)
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    pub fn set_on_error<F>(&mut self, callback: F)
    where
        F: FnMut(&ErrorEvent) + Send + 'static,
    {
        self.callbacks.on_error = Some(Box::new(callback));
    }

    pub fn set_on_state_changed<F>(&mut self, callback: F)
    where
        F: FnMut(InteractivityState) + Send + 'static,
    {
        self.callbacks.on_state_changed = Some(Box::new(callback));
    }

    pub fn set_on_participant_changed<F>(&mut self, callback: F)
    where
        F: FnMut(&Participant, ParticipantState) + Send + 'static,
    {
        self.callbacks.on_participant_changed = Some(Box::new(callback));
    }

    pub fn set_on_button<F>(&mut self, callback: F)
    where
        F: FnMut(&ButtonEvent) + Send + 'static,
    {
        self.callbacks.on_button = Some(Box::new(callback));
    }

    pub fn set_on_joystick<F>(&mut self, callback: F)
    where
        F: FnMut(&JoystickEvent) + Send + 'static,
    {
        self.callbacks.on_joystick = Some(Box::new(callback));
    }

    pub fn set_on_message<F>(&mut self, callback: F)
    where
        F: FnMut(&str, &Value) + Send + 'static,
    {
        self.callbacks.on_message = Some(Box::new(callback));
    }

    pub fn set_on_short_code<F>(&mut self, callback: F)
    where
        F: FnMut(&str, u64) + Send + 'static,
    {
        self.callbacks.on_short_code = Some(Box::new(callback));
    }
}
