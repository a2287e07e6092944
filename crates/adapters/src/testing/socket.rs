//! Recording socket mock
//!
//! Lets tests drive connection state and inbound frames, and assert on
//! everything the client sent. `open` succeeds by default and immediately
//! reports `Opened`; a scripted connect error turns the next open into a
//! failure instead.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use stagelink_ports::{SocketError, SocketEvent, SocketEventSender, SocketPort};

#[derive(Debug, Clone)]
pub struct RecordedOpen {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

#[derive(Default)]
struct State {
    opens: Vec<RecordedOpen>,
    sent: Vec<String>,
    closes: Vec<String>,
    events: Option<SocketEventSender>,
    open: bool,
    next_open_error: Option<String>,
}

/// Recording `SocketPort` for tests.
#[derive(Clone, Default)]
pub struct RecordingSocketPort {
    state: Arc<Mutex<State>>,
}

impl RecordingSocketPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` call fail with this message.
    pub fn fail_next_open(&self, message: &str) {
        self.state.lock().unwrap().next_open_error = Some(message.to_string());
    }

    /// Every open attempt with its handshake headers.
    pub fn opens(&self) -> Vec<RecordedOpen> {
        self.state.lock().unwrap().opens.clone()
    }

    /// Every text frame the client sent, in order.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Close reasons the client passed to `close`.
    pub fn closes(&self) -> Vec<String> {
        self.state.lock().unwrap().closes.clone()
    }

    /// Push one event at the client, as the real adapter would.
    pub fn emit(&self, event: SocketEvent) {
        let sender = {
            let mut state = self.state.lock().unwrap();
            if matches!(event, SocketEvent::Closed { .. }) {
                state.open = false;
            }
            state.events.clone()
        };
        if let Some(sender) = sender {
            let _ = sender.send(event);
        }
    }

    /// Convenience: emit a server method push.
    pub fn emit_method(&self, method: &str, params: serde_json::Value) {
        let text = serde_json::json!({"type": "method", "method": method, "params": params});
        self.emit(SocketEvent::Message(text.to_string()));
    }

    /// Convenience: emit a reply for an id the client allocated.
    pub fn emit_reply(&self, id: u32, result: serde_json::Value) {
        let text = serde_json::json!({"type": "reply", "id": id, "result": result});
        self.emit(SocketEvent::Message(text.to_string()));
    }

    /// Convenience: emit a reply carrying an error object.
    pub fn emit_reply_error(&self, id: u32, code: u32, message: &str) {
        let text = serde_json::json!({
            "type": "reply", "id": id, "result": null,
            "error": {"code": code, "message": message}
        });
        self.emit(SocketEvent::Message(text.to_string()));
    }
}

#[async_trait]
impl SocketPort for RecordingSocketPort {
    async fn open(
        &self,
        url: &str,
        headers: &[(String, String)],
        events: SocketEventSender,
    ) -> Result<(), SocketError> {
        let mut state = self.state.lock().unwrap();
        state.opens.push(RecordedOpen {
            url: url.to_string(),
            headers: headers.to_vec(),
        });
        if let Some(message) = state.next_open_error.take() {
            return Err(SocketError::Connect(message));
        }
        state.open = true;
        state.events = Some(events.clone());
        let _ = events.send(SocketEvent::Opened);
        Ok(())
    }

    async fn send(&self, text: String) -> Result<(), SocketError> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(SocketError::NotOpen);
        }
        state.sent.push(text);
        Ok(())
    }

    async fn close(&self, reason: &str) {
        let mut state = self.state.lock().unwrap();
        state.closes.push(reason.to_string());
        state.open = false;
        state.events = None;
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }
}
