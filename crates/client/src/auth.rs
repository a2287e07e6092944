//! OAuth controller
//!
//! Drives the short-code flow end to end: request a code, poll for the user's
//! approval, exchange the grant, and keep the token fresh with
//! verify/refresh. Pure state machine; every network call it wants is
//! returned as an [`Action`] and its result fed back in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use stagelink_ports::{HttpRequest, HttpResponse};

use crate::actions::{Action, RequestTag, TimerKind};
use crate::error::{ErrorEvent, ErrorKind};
use crate::events::{InteractiveEvent, InteractivityState};

/// OAuth scope requested for the interactive session.
const SHORT_CODE_SCOPE: &str = "interactive:robot:self";

/// Polling cadence for `/oauth/shortcode/check`.
pub(crate) const AUTH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Retry delay after a failed short-code request.
const SHORT_CODE_RETRY: Duration = Duration::from_secs(5);

/// Liveness delay for re-running a verify that failed on the network.
const VERIFY_RETRY: Duration = Duration::from_millis(500);

pub(crate) const PROTOCOL_VERSION: &str = "2.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AuthState {
    NoCredentials,
    ShortCodeOutstanding,
    Exchanging,
    HaveTokens,
    Verifying,
    Refreshing,
    Failed,
}

/// Token pair as persisted by the storage provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CachedTokens {
    pub auth_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ShortCode {
    pub code: String,
    pub expires_in_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ShortCodeCreated {
    code: String,
    expires_in: u64,
    handle: String,
}

#[derive(Debug, Deserialize)]
struct ShortCodeApproved {
    code: String,
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrantKind {
    Exchange,
    Refresh,
}

pub(crate) struct AuthController {
    state: AuthState,
    api_base: String,
    client_id: String,
    project_version_id: String,
    auth_header: Option<String>,
    refresh_token: Option<String>,
    short_code: Option<ShortCode>,
    handle: Option<String>,
    /// `wss` -> `https` rewrite of the socket URL, used for verification.
    verify_url: Option<String>,
    /// Verification was requested before discovery resolved a socket URL.
    verify_pending: bool,
}

impl AuthController {
    pub fn new(api_base: &str, client_id: &str, project_version_id: &str) -> Self {
        Self {
            state: AuthState::NoCredentials,
            api_base: api_base.to_string(),
            client_id: client_id.to_string(),
            project_version_id: project_version_id.to_string(),
            auth_header: None,
            refresh_token: None,
            short_code: None,
            handle: None,
            verify_url: None,
            verify_pending: false,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn auth_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    pub fn short_code(&self) -> Option<&ShortCode> {
        self.short_code.as_ref()
    }

    /// Entry point: cached tokens get verified, otherwise the short-code
    /// flow starts from scratch.
    pub fn bootstrap(&mut self, cached: Option<CachedTokens>) -> Vec<Action> {
        match cached {
            Some(tokens) => {
                self.auth_header = Some(tokens.auth_token);
                self.refresh_token = Some(tokens.refresh_token);
                self.begin_verify()
            }
            None => self.request_short_code(),
        }
    }

    /// Discovery resolved the socket URL; release a deferred verification.
    pub fn set_socket_url(&mut self, wss_url: &str) -> Vec<Action> {
        self.verify_url = Some(https_from_wss(wss_url));
        if self.verify_pending {
            self.verify_pending = false;
            self.begin_verify()
        } else {
            Vec::new()
        }
    }

    /// Reconnect path: re-check credentials before re-opening the socket.
    pub fn verify_token(&mut self) -> Vec<Action> {
        match self.state {
            AuthState::ShortCodeOutstanding | AuthState::Exchanging | AuthState::Refreshing => {
                Vec::new()
            }
            _ if self.auth_header.is_some() => self.begin_verify(),
            _ => self.request_short_code(),
        }
    }

    pub fn handle_timer(&mut self, kind: TimerKind) -> Vec<Action> {
        match kind {
            TimerKind::CheckAuthStatus => match (&self.state, &self.handle) {
                (AuthState::ShortCodeOutstanding, Some(handle)) => {
                    let url = format!("{}/oauth/shortcode/check/{}", self.api_base, handle);
                    vec![Action::Http {
                        tag: RequestTag::CheckShortCode,
                        request: HttpRequest::get(url),
                    }]
                }
                _ => Vec::new(),
            },
            // The outstanding code expired (or its request failed); ask for a
            // fresh one and abandon the old handle.
            TimerKind::RefreshShortCode => self.request_short_code(),
            TimerKind::Reconnect => Vec::new(),
        }
    }

    pub fn handle_http(&mut self, tag: RequestTag, response: HttpResponse) -> Vec<Action> {
        match tag {
            RequestTag::CreateShortCode => self.on_short_code_created(response),
            RequestTag::CheckShortCode => self.on_short_code_checked(response),
            RequestTag::ExchangeToken => self.on_token_granted(response, GrantKind::Exchange),
            RequestTag::RefreshToken => self.on_token_granted(response, GrantKind::Refresh),
            RequestTag::VerifyToken => self.on_verified(response),
            RequestTag::DiscoverHosts => Vec::new(),
        }
    }

    pub fn handle_http_failure(&mut self, tag: RequestTag, error: &str) -> Vec<Action> {
        tracing::error!("auth request {:?} failed: {}", tag, error);
        match tag {
            RequestTag::CreateShortCode => vec![
                Action::Emit(InteractiveEvent::Error(ErrorEvent::new(
                    ErrorKind::AuthFailure,
                    format!("short code request failed: {error}"),
                ))),
                Action::StartTimer {
                    timer: TimerKind::RefreshShortCode,
                    interval: SHORT_CODE_RETRY,
                },
            ],
            // The 500 ms poll retries on its own.
            RequestTag::CheckShortCode => Vec::new(),
            RequestTag::ExchangeToken => {
                let mut actions = vec![Action::Emit(InteractiveEvent::Error(ErrorEvent::new(
                    ErrorKind::AuthFailure,
                    format!("token exchange failed: {error}"),
                )))];
                actions.extend(self.request_short_code());
                actions
            }
            RequestTag::RefreshToken => self.fall_back_to_short_code(format!(
                "token refresh failed: {error}"
            )),
            RequestTag::VerifyToken => vec![Action::StartTimer {
                timer: TimerKind::Reconnect,
                interval: VERIFY_RETRY,
            }],
            RequestTag::DiscoverHosts => Vec::new(),
        }
    }

    // =========================================================================
    // Short code
    // =========================================================================

    fn request_short_code(&mut self) -> Vec<Action> {
        self.state = AuthState::NoCredentials;
        self.handle = None;
        let url = format!("{}/oauth/shortcode", self.api_base);
        let body = json!({"client_id": self.client_id, "scope": SHORT_CODE_SCOPE});
        vec![Action::Http {
            tag: RequestTag::CreateShortCode,
            request: HttpRequest::post(url, body),
        }]
    }

    fn on_short_code_created(&mut self, response: HttpResponse) -> Vec<Action> {
        let created = if response.is_success() {
            serde_json::from_str::<ShortCodeCreated>(&response.body).ok()
        } else {
            None
        };
        let Some(created) = created else {
            tracing::warn!(
                "short code request returned {}; retrying shortly",
                response.status
            );
            return vec![
                Action::Emit(InteractiveEvent::Error(ErrorEvent::new(
                    ErrorKind::AuthFailure,
                    format!("short code request returned status {}", response.status),
                ))),
                Action::StartTimer {
                    timer: TimerKind::RefreshShortCode,
                    interval: SHORT_CODE_RETRY,
                },
            ];
        };

        self.state = AuthState::ShortCodeOutstanding;
        self.short_code = Some(ShortCode {
            code: created.code.clone(),
            expires_in_secs: created.expires_in,
        });
        self.handle = Some(created.handle);
        vec![
            Action::SetState(InteractivityState::ShortCodeRequired),
            Action::Emit(InteractiveEvent::ShortCode {
                code: created.code,
                expires_in_secs: created.expires_in,
            }),
            Action::StartTimer {
                timer: TimerKind::RefreshShortCode,
                interval: Duration::from_secs(created.expires_in),
            },
            Action::StartTimer {
                timer: TimerKind::CheckAuthStatus,
                interval: AUTH_POLL_INTERVAL,
            },
        ]
    }

    fn on_short_code_checked(&mut self, response: HttpResponse) -> Vec<Action> {
        match response.status {
            200 => {
                let Ok(approved) = serde_json::from_str::<ShortCodeApproved>(&response.body)
                else {
                    tracing::warn!("short code check returned 200 with an unreadable body");
                    return Vec::new();
                };
                self.state = AuthState::Exchanging;
                let url = format!("{}/oauth/token", self.api_base);
                let body = json!({
                    "client_id": self.client_id,
                    "code": approved.code,
                    "grant_type": "authorization_code",
                });
                vec![
                    Action::StopTimer {
                        timer: TimerKind::CheckAuthStatus,
                    },
                    Action::StopTimer {
                        timer: TimerKind::RefreshShortCode,
                    },
                    Action::Http {
                        tag: RequestTag::ExchangeToken,
                        request: HttpRequest::post(url, body),
                    },
                ]
            }
            // Not approved yet / handle not known yet: keep polling.
            204 | 404 => Vec::new(),
            status => {
                tracing::warn!("short code check returned {}", status);
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Grants
    // =========================================================================

    fn on_token_granted(&mut self, response: HttpResponse, kind: GrantKind) -> Vec<Action> {
        let grant = if response.is_success() {
            serde_json::from_str::<TokenGrant>(&response.body).ok()
        } else {
            None
        };
        let Some(grant) = grant else {
            return match kind {
                GrantKind::Exchange => {
                    let mut actions = vec![Action::Emit(InteractiveEvent::Error(ErrorEvent::new(
                        ErrorKind::AuthFailure,
                        format!("token exchange returned status {}", response.status),
                    )))];
                    actions.extend(self.request_short_code());
                    actions
                }
                GrantKind::Refresh => self.fall_back_to_short_code(format!(
                    "token refresh returned status {}",
                    response.status
                )),
            };
        };

        let auth = format!("Bearer {}", grant.access_token);
        self.auth_header = Some(auth.clone());
        self.refresh_token = Some(grant.refresh_token.clone());
        let mut actions = vec![Action::SaveTokens {
            auth,
            refresh: grant.refresh_token,
        }];
        match kind {
            GrantKind::Exchange => {
                self.state = AuthState::HaveTokens;
                self.short_code = None;
                actions.push(Action::SetState(InteractivityState::Initializing));
                actions.push(Action::Connect);
            }
            GrantKind::Refresh => {
                actions.extend(self.begin_verify());
            }
        }
        actions
    }

    // =========================================================================
    // Verification
    // =========================================================================

    fn begin_verify(&mut self) -> Vec<Action> {
        self.state = AuthState::Verifying;
        let Some(url) = self.verify_url.clone() else {
            self.verify_pending = true;
            return Vec::new();
        };
        let Some(auth) = self.auth_header.clone() else {
            return self.request_short_code();
        };
        vec![Action::Http {
            tag: RequestTag::VerifyToken,
            request: HttpRequest::get(url)
                .with_header("Authorization", auth)
                .with_header("X-Interactive-Version", &self.project_version_id)
                .with_header("X-Protocol-Version", PROTOCOL_VERSION),
        }]
    }

    fn on_verified(&mut self, response: HttpResponse) -> Vec<Action> {
        match response.status {
            // 400 is the expected answer to a plain GET against an endpoint
            // that wants a WebSocket upgrade; the token was accepted.
            200 | 400 => {
                self.state = AuthState::HaveTokens;
                vec![Action::Connect]
            }
            401 => {
                self.state = AuthState::Refreshing;
                let mut actions = vec![Action::Emit(InteractiveEvent::Error(ErrorEvent::new(
                    ErrorKind::TokenInvalid,
                    "cached token was rejected, refreshing",
                )))];
                match self.refresh_token.clone() {
                    Some(refresh_token) => {
                        let url = format!("{}/oauth/token", self.api_base);
                        let body = json!({
                            "client_id": self.client_id,
                            "refresh_token": refresh_token,
                            "grant_type": "refresh_token",
                        });
                        actions.push(Action::Http {
                            tag: RequestTag::RefreshToken,
                            request: HttpRequest::post(url, body),
                        });
                    }
                    None => actions.extend(self.request_short_code()),
                }
                actions
            }
            status => {
                tracing::error!("token verification returned unexpected status {}", status);
                self.state = AuthState::Failed;
                vec![Action::Emit(InteractiveEvent::Error(ErrorEvent::new(
                    ErrorKind::AuthFailure,
                    format!("token verification returned status {status}"),
                )))]
            }
        }
    }

    fn fall_back_to_short_code(&mut self, message: String) -> Vec<Action> {
        self.auth_header = None;
        self.refresh_token = None;
        let mut actions = vec![
            Action::Emit(InteractiveEvent::Error(ErrorEvent::new(
                ErrorKind::AuthFailure,
                message,
            ))),
            Action::ClearTokens,
        ];
        actions.extend(self.request_short_code());
        actions
    }
}

fn https_from_wss(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        url.to_string()
    }
}
