//! Actions and internal events
//!
//! The auth and connection controllers are pure state machines: they accept
//! one event and return the [`Action`]s to perform. The facade's driver
//! executes them, which keeps every side effect in one place and lets tests
//! assert on transitions without any I/O.

use std::time::Duration;

use serde_json::Value;

use stagelink_ports::{HttpRequest, HttpResponse, SocketEvent};

use crate::events::{InteractiveEvent, InteractivityState};

/// Names the in-flight HTTP request so its completion routes back to the
/// state machine that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestTag {
    DiscoverHosts,
    CreateShortCode,
    CheckShortCode,
    ExchangeToken,
    RefreshToken,
    VerifyToken,
}

/// The client's named timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    CheckAuthStatus,
    RefreshShortCode,
    Reconnect,
}

impl TimerKind {
    pub fn name(self) -> &'static str {
        match self {
            TimerKind::CheckAuthStatus => "check_auth_status",
            TimerKind::RefreshShortCode => "refresh_short_code",
            TimerKind::Reconnect => "reconnect",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "check_auth_status" => Some(TimerKind::CheckAuthStatus),
            "refresh_short_code" => Some(TimerKind::RefreshShortCode),
            "reconnect" => Some(TimerKind::Reconnect),
            _ => None,
        }
    }
}

/// One side effect requested by a state machine.
#[derive(Debug, Clone)]
pub(crate) enum Action {
    Http {
        tag: RequestTag,
        request: HttpRequest,
    },
    OpenSocket {
        url: String,
        headers: Vec<(String, String)>,
    },
    CloseSocket {
        reason: String,
    },
    /// Send one RPC frame; the session allocates the id and records the
    /// outstanding entry just before the frame enters the transport.
    SendRpc {
        method: String,
        params: Value,
    },
    StartTimer {
        timer: TimerKind,
        interval: Duration,
    },
    StopTimer {
        timer: TimerKind,
    },
    SaveTokens {
        auth: String,
        refresh: String,
    },
    ClearTokens,
    SetState(InteractivityState),
    Emit(InteractiveEvent),
    /// Credentials are good; the connection controller may open the socket.
    Connect,
    /// Re-check credentials before a reconnect attempt.
    VerifyToken,
}

impl Action {
    pub fn send_rpc(method: impl Into<String>, params: Value) -> Self {
        Action::SendRpc {
            method: method.into(),
            params,
        }
    }
}

/// Everything the I/O side can put on the consumer queue.
#[derive(Debug)]
pub(crate) enum InternalEvent {
    HttpCompleted {
        tag: RequestTag,
        response: HttpResponse,
    },
    HttpFailed {
        tag: RequestTag,
        error: String,
    },
    Socket(SocketEvent),
    SocketOpenFailed {
        error: String,
    },
    TimerFired(TimerKind),
}
