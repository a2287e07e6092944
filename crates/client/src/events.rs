//! Events delivered to the host during `do_work`

use serde_json::Value;

use crate::error::ErrorEvent;
use crate::model::{Participant, ParticipantState};

/// Lifecycle phase of the facade. Every transition is observable as an
/// [`InteractiveEvent::InteractivityStateChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractivityState {
    NotInitialized,
    Initializing,
    /// Waiting for the user to enter the short code on the service's site.
    ShortCodeRequired,
    /// Connected; groups and scenes are populated.
    Initialized,
    /// `ready` sent, waiting for the service to confirm.
    InteractivityPending,
    InteractivityEnabled,
    InteractivityDisabled,
}

/// One button press or release, as routed by `giveInput`.
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonEvent {
    pub control_id: String,
    pub session_id: String,
    pub user_id: u32,
    pub is_pressed: bool,
    /// Present when the press consumed sparks; capture it to commit the spend.
    pub transaction_id: Option<String>,
}

/// One joystick move, as routed by `giveInput`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoystickEvent {
    pub control_id: String,
    pub session_id: String,
    pub user_id: u32,
    pub x: f64,
    pub y: f64,
}

/// Everything the host can observe from the pump.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveEvent {
    Error(ErrorEvent),
    InteractivityStateChanged(InteractivityState),
    ParticipantStateChanged {
        participant: Participant,
        state: ParticipantState,
    },
    Button(ButtonEvent),
    Joystick(JoystickEvent),
    /// A short code is ready to be shown to the user.
    ShortCode { code: String, expires_in_secs: u64 },
    /// A server push the client does not consume itself.
    Message { method: String, params: Value },
}
