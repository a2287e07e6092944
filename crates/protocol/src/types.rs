//! Entity payloads carried inside frames.
//!
//! The wire uses camelCase identifier keys (`sceneID`, `controlID`,
//! `sessionID`). Every field that the service may omit carries a default so
//! partial objects reconcile instead of failing the whole frame.

use serde::{Deserialize, Serialize};

/// Well-known group id that always exists in the client view.
pub const DEFAULT_GROUP_ID: &str = "default";
/// Well-known scene id that always exists in the client view.
pub const DEFAULT_SCENE_ID: &str = "default";

fn default_group_id() -> String {
    DEFAULT_GROUP_ID.to_string()
}

fn default_scene_id() -> String {
    DEFAULT_SCENE_ID.to_string()
}

// =============================================================================
// Participants
// =============================================================================

/// One participant as the service describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantData {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "userID", default)]
    pub user_id: u32,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub level: u32,
    #[serde(rename = "groupID", default = "default_group_id")]
    pub group_id: String,
    /// Milliseconds since the epoch.
    #[serde(rename = "connectedAt", default)]
    pub connected_at: u64,
    /// Milliseconds since the epoch.
    #[serde(rename = "lastInputAt", default)]
    pub last_input_at: u64,
    #[serde(rename = "disabled", default)]
    pub input_disabled: bool,
    #[serde(default)]
    pub etag: String,
}

// =============================================================================
// Groups & Scenes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupData {
    #[serde(rename = "groupID")]
    pub group_id: String,
    #[serde(rename = "sceneID", default = "default_scene_id")]
    pub scene_id: String,
    #[serde(default)]
    pub etag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    #[serde(rename = "sceneID")]
    pub scene_id: String,
    #[serde(default)]
    pub etag: String,
    #[serde(default)]
    pub controls: Vec<ControlData>,
}

// =============================================================================
// Controls
// =============================================================================

/// Control kind tag. Unknown kinds deserialize to `Generic` so a newer
/// service cannot break an older client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Button,
    Joystick,
    #[default]
    #[serde(other)]
    Generic,
}

/// One control as the service describes it. The kind decides which optional
/// fields are meaningful; the client casts this into its typed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlData {
    #[serde(rename = "controlID")]
    pub control_id: String,
    #[serde(default)]
    pub kind: ControlKind,
    #[serde(rename = "sceneID", default)]
    pub scene_id: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(rename = "helpText", default)]
    pub help_text: String,
    #[serde(default)]
    pub etag: String,
    /// Spark cost per press (buttons only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u32>,
    /// Cooldown expiration in epoch milliseconds (buttons only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<i64>,
    /// Fill fraction in `[0, 1]` (buttons only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    /// Label override (buttons only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// =============================================================================
// Input
// =============================================================================

/// Params of a `giveInput` push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiveInputParams {
    /// Session id of the participant that produced the input.
    #[serde(rename = "participantID")]
    pub participant_id: String,
    /// Present when the press consumed sparks and awaits `capture`.
    #[serde(rename = "transactionID", default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub input: InputData,
}

/// One pointer event on a control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputData {
    #[serde(rename = "controlID")]
    pub control_id: String,
    pub event: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Pointer event names carried in [`InputData::event`].
pub mod input_events {
    pub const MOUSE_DOWN: &str = "mousedown";
    pub const MOUSE_UP: &str = "mouseup";
    pub const MOVE: &str = "move";
}

// =============================================================================
// Discovery
// =============================================================================

/// One entry of the `/interactive/hosts` discovery response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEntry {
    pub address: String,
}
