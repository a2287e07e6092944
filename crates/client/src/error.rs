//! Error types
//!
//! Runtime failures never panic and never tear the client down; they surface
//! to the host as [`ErrorEvent`]s on the event queue, usually alongside a
//! recovery transition. [`ClientError`] is reserved for the synchronous API
//! surface (bad configuration, unknown control ids).

/// Numeric code attached to error events that carry no service-assigned code.
pub const DEFAULT_ERROR_CODE: u32 = 83;

/// What went wrong, independent of the wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Discovery endpoint unreachable or malformed.
    DiscoveryFailure,
    /// Short-code, exchange, or refresh failed.
    AuthFailure,
    /// Token verification returned 401.
    TokenInvalid,
    /// Malformed server frame; the connection continues.
    ProtocolError,
    /// Close code 4019/4020: the project cannot be used by this client.
    ProjectInaccessible,
    /// Close code 4021: another session already holds the project.
    DuplicateSession,
    /// Any other close; a reconnect will be attempted.
    TransportBroken,
    /// A reply carried an error object.
    ReplyError,
    /// The host called an operation out of lifecycle order.
    MisuseError,
}

/// Error surfaced to the host through the event queue.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub code: u32,
    pub message: String,
}

impl ErrorEvent {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: DEFAULT_ERROR_CODE,
            message: message.into(),
        }
    }

    pub fn with_code(kind: ErrorKind, code: u32, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({}): {}", self.kind, self.code, self.message)
    }
}

/// Errors returned synchronously from the facade API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration value {0} is missing")]
    MissingConfig(&'static str),
    #[error("failed to read config file: {0}")]
    ConfigFile(String),
    #[error("unknown control {0}")]
    UnknownControl(String),
    #[error("control {0} is not a button")]
    NotAButton(String),
    #[error("unknown participant {0}")]
    UnknownParticipant(u32),
}
