//! Shared harness for facade tests: the client wired to scripted/recording
//! port doubles, with every host callback captured for assertions.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::Value;

use stagelink_adapters::testing::{
    ManualTimers, MemoryStorage, RecordingSocketPort, ScriptedHttpPort,
};
use stagelink_client::{
    ButtonEvent, ClientConfig, ClientPorts, ErrorEvent, InteractiveClient, InteractivityState,
    JoystickEvent, Participant, ParticipantState,
};

#[derive(Default)]
pub struct Recorded {
    pub errors: Vec<ErrorEvent>,
    pub states: Vec<InteractivityState>,
    pub participants: Vec<(Participant, ParticipantState)>,
    pub buttons: Vec<ButtonEvent>,
    pub joysticks: Vec<JoystickEvent>,
    pub short_codes: Vec<(String, u64)>,
}

pub struct Harness {
    pub http: ScriptedHttpPort,
    pub socket: RecordingSocketPort,
    pub storage: MemoryStorage,
    pub timers: ManualTimers,
    pub client: InteractiveClient,
    recorded: Arc<Mutex<Recorded>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::new("A", "V"))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let http = ScriptedHttpPort::new();
        let socket = RecordingSocketPort::new();
        let storage = MemoryStorage::new();
        let timers = ManualTimers::new();
        let ports = ClientPorts {
            http: Arc::new(http.clone()),
            socket: Arc::new(socket.clone()),
            storage: Arc::new(storage.clone()),
            timers: Arc::new(timers.clone()),
        };
        let mut client =
            InteractiveClient::new(config, ports, tokio::runtime::Handle::current()).unwrap();

        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let slot = Arc::clone(&recorded);
        client.set_on_error(move |e| slot.lock().unwrap().errors.push(e.clone()));
        let slot = Arc::clone(&recorded);
        client.set_on_state_changed(move |s| slot.lock().unwrap().states.push(s));
        let slot = Arc::clone(&recorded);
        client.set_on_participant_changed(move |p, s| {
            slot.lock().unwrap().participants.push((p.clone(), s))
        });
        let slot = Arc::clone(&recorded);
        client.set_on_button(move |b| slot.lock().unwrap().buttons.push(b.clone()));
        let slot = Arc::clone(&recorded);
        client.set_on_joystick(move |j| slot.lock().unwrap().joysticks.push(j.clone()));
        let slot = Arc::clone(&recorded);
        client.set_on_short_code(move |code, expires| {
            slot.lock()
                .unwrap()
                .short_codes
                .push((code.to_string(), expires))
        });

        Self {
            http,
            socket,
            storage,
            timers,
            client,
            recorded,
        }
    }

    /// Alternate the pump with yields so spawned I/O tasks complete on the
    /// current-thread test runtime.
    pub async fn pump(&mut self) {
        for _ in 0..6 {
            self.client.do_work();
            tokio::task::yield_now().await;
        }
        self.client.do_work();
    }

    /// Let spawned tasks run without ticking the pump (for exact-tick tests).
    pub async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }

    /// Every frame the client sent, parsed.
    pub fn sent_frames(&self) -> Vec<Value> {
        self.socket
            .sent()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub fn frame_id(frame: &Value) -> u32 {
        frame["id"].as_u64().unwrap() as u32
    }
}
