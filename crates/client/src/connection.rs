//! Connection controller
//!
//! Owns endpoint discovery, the socket-open gating booleans, and the close
//! policy. Reconnects are never a blind re-open: the backoff timer asks the
//! auth controller to verify the token first, since credentials may have
//! expired during the outage.

use std::time::Duration;

use stagelink_ports::HttpRequest;
use stagelink_protocol::HostEntry;

use crate::actions::{Action, RequestTag, TimerKind};
use crate::auth::PROTOCOL_VERSION;
use crate::error::{ErrorEvent, ErrorKind};
use crate::events::{InteractiveEvent, InteractivityState};

/// Delay before the reconnect timer re-checks credentials.
pub(crate) const RECONNECT_INTERVAL: Duration = Duration::from_millis(500);

/// The interactive project is not accessible to this user.
const CLOSE_PROJECT_NOT_ACCESSIBLE: u16 = 4019;
/// The interactive version was not found.
const CLOSE_VERSION_NOT_FOUND: u16 = 4020;
/// Another session already holds this project.
const CLOSE_DUPLICATE_SESSION: u16 = 4021;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    Idle,
    Discovering,
    Authenticating,
    Connecting,
    Open,
    Closing,
    Backoff,
}

pub(crate) struct ConnectionController {
    state: ConnectionState,
    api_base: String,
    project_version_id: String,
    share_code: Option<String>,
    socket_url: Option<String>,
    pending_connect: bool,
    connected: bool,
}

impl ConnectionController {
    pub fn new(api_base: &str, project_version_id: &str, share_code: Option<&str>) -> Self {
        Self {
            state: ConnectionState::Idle,
            api_base: api_base.to_string(),
            project_version_id: project_version_id.to_string(),
            share_code: share_code.map(|s| s.to_string()),
            socket_url: None,
            pending_connect: false,
            connected: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn begin_discovery(&mut self) -> Vec<Action> {
        self.state = ConnectionState::Discovering;
        vec![Action::Http {
            tag: RequestTag::DiscoverHosts,
            request: HttpRequest::get(format!("{}/interactive/hosts", self.api_base)),
        }]
    }

    /// Returns the resolved socket URL (if any) so the caller can hand it to
    /// the auth controller for verification.
    pub fn handle_discovery(
        &mut self,
        status: u16,
        body: &str,
    ) -> (Option<String>, Vec<Action>) {
        if (200..300).contains(&status) {
            if let Ok(hosts) = serde_json::from_str::<Vec<HostEntry>>(body) {
                if let Some(first) = hosts.first() {
                    self.socket_url = Some(first.address.clone());
                    self.state = ConnectionState::Authenticating;
                    return (Some(first.address.clone()), Vec::new());
                }
            }
        }
        (
            None,
            self.discovery_failed(format!("discovery returned status {status}")),
        )
    }

    pub fn handle_discovery_failure(&mut self, error: &str) -> Vec<Action> {
        self.discovery_failed(format!("discovery request failed: {error}"))
    }

    /// Discovery trouble is not fatal: a cached URL keeps working and the
    /// reconnect timer retries when there is none.
    fn discovery_failed(&mut self, message: String) -> Vec<Action> {
        tracing::warn!("{}", message);
        let mut actions = vec![Action::Emit(InteractiveEvent::Error(ErrorEvent::new(
            ErrorKind::DiscoveryFailure,
            message,
        )))];
        if self.socket_url.is_none() {
            actions.push(Action::StartTimer {
                timer: TimerKind::Reconnect,
                interval: RECONNECT_INTERVAL,
            });
        } else {
            self.state = ConnectionState::Authenticating;
        }
        actions
    }

    /// Credentials are ready; open the socket unless one is already open or
    /// opening.
    pub fn connect(&mut self, auth_header: Option<&str>) -> Vec<Action> {
        if self.pending_connect || self.connected {
            return Vec::new();
        }
        let Some(url) = self.socket_url.clone() else {
            return self.begin_discovery();
        };
        let Some(auth) = auth_header else {
            tracing::warn!("connect requested without credentials");
            return Vec::new();
        };

        self.pending_connect = true;
        self.state = ConnectionState::Connecting;

        let mut headers = vec![
            ("Authorization".to_string(), auth.to_string()),
            (
                "X-Interactive-Version".to_string(),
                self.project_version_id.clone(),
            ),
            ("X-Protocol-Version".to_string(), PROTOCOL_VERSION.to_string()),
        ];
        if let Some(share_code) = &self.share_code {
            headers.push(("X-Interactive-Sharecode".to_string(), share_code.clone()));
        }
        vec![Action::OpenSocket { url, headers }]
    }

    /// Nothing else happens at open; the session waits for the `hello` push.
    pub fn on_open(&mut self) -> Vec<Action> {
        self.pending_connect = false;
        self.connected = true;
        self.state = ConnectionState::Open;
        vec![Action::StopTimer {
            timer: TimerKind::Reconnect,
        }]
    }

    pub fn on_open_failed(&mut self, error: &str) -> Vec<Action> {
        tracing::error!("socket open failed: {}", error);
        self.pending_connect = false;
        self.state = ConnectionState::Backoff;
        vec![
            Action::Emit(InteractiveEvent::Error(ErrorEvent::new(
                ErrorKind::TransportBroken,
                format!("connection attempt failed: {error}"),
            ))),
            Action::StartTimer {
                timer: TimerKind::Reconnect,
                interval: RECONNECT_INTERVAL,
            },
        ]
    }

    pub fn on_closed(&mut self, code: u16, reason: &str) -> Vec<Action> {
        self.pending_connect = false;
        self.connected = false;
        match code {
            CLOSE_PROJECT_NOT_ACCESSIBLE => self.fatal_close(
                ErrorKind::ProjectInaccessible,
                code,
                format!("the interactive project is not accessible (close code {code})"),
            ),
            CLOSE_VERSION_NOT_FOUND => self.fatal_close(
                ErrorKind::ProjectInaccessible,
                code,
                format!(
                    "the interactive version was not found or this user has no access (close code {code})"
                ),
            ),
            CLOSE_DUPLICATE_SESSION => self.fatal_close(
                ErrorKind::DuplicateSession,
                code,
                format!("another session already holds this project (close code {code})"),
            ),
            _ => {
                tracing::warn!("connection closed ({}: {}), backing off", code, reason);
                self.state = ConnectionState::Backoff;
                vec![
                    Action::SetState(InteractivityState::InteractivityDisabled),
                    Action::Emit(InteractiveEvent::Error(ErrorEvent::with_code(
                        ErrorKind::TransportBroken,
                        u32::from(code),
                        format!("connection closed (close code {code}: {reason})"),
                    ))),
                    Action::StartTimer {
                        timer: TimerKind::Reconnect,
                        interval: RECONNECT_INTERVAL,
                    },
                ]
            }
        }
    }

    fn fatal_close(&mut self, kind: ErrorKind, code: u16, message: String) -> Vec<Action> {
        tracing::error!("{}", message);
        self.state = ConnectionState::Idle;
        vec![
            Action::SetState(InteractivityState::InteractivityDisabled),
            Action::Emit(InteractiveEvent::Error(ErrorEvent::with_code(
                kind,
                u32::from(code),
                message,
            ))),
        ]
    }

    /// The reconnect timer re-checks credentials instead of re-opening
    /// blindly; with no known URL it retries discovery first.
    pub fn on_reconnect_timer(&mut self) -> Vec<Action> {
        if self.connected || self.pending_connect {
            return Vec::new();
        }
        if self.socket_url.is_none() {
            self.begin_discovery()
        } else {
            vec![Action::VerifyToken]
        }
    }

    pub fn begin_close(&mut self, reason: &str) -> Vec<Action> {
        self.state = ConnectionState::Closing;
        self.connected = false;
        self.pending_connect = false;
        vec![Action::CloseSocket {
            reason: reason.to_string(),
        }]
    }
}
