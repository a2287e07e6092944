//! Mirrored entities
//!
//! These are the client-side copies of the service's authoritative model.
//! Reconciliation is whole-object: an incoming payload with a newer `etag`
//! replaces the local copy, field by field, with no merging.
//!
//! Controls are a sum type owned by one list; the typed button/joystick views
//! are projections over it, so the two views can never disagree.

use stagelink_protocol::{
    ControlData, ControlKind, GroupData, ParticipantData, SceneData, DEFAULT_GROUP_ID,
    DEFAULT_SCENE_ID,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub scene_id: String,
    pub etag: String,
}

impl Scene {
    pub(crate) fn from_data(data: &SceneData) -> Self {
        Self {
            scene_id: data.scene_id.clone(),
            etag: data.etag.clone(),
        }
    }

    /// The well-known scene the service guarantees to exist.
    pub fn default_scene() -> Self {
        Self {
            scene_id: DEFAULT_SCENE_ID.to_string(),
            etag: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub group_id: String,
    pub scene_id: String,
    pub etag: String,
}

impl Group {
    pub fn new(group_id: impl Into<String>, scene_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            scene_id: scene_id.into(),
            etag: String::new(),
        }
    }

    pub(crate) fn from_data(data: &GroupData) -> Self {
        Self {
            group_id: data.group_id.clone(),
            scene_id: data.scene_id.clone(),
            etag: data.etag.clone(),
        }
    }

    pub(crate) fn to_data(&self) -> GroupData {
        GroupData {
            group_id: self.group_id.clone(),
            scene_id: self.scene_id.clone(),
            etag: self.etag.clone(),
        }
    }

    /// The well-known group every participant starts in.
    pub fn default_group() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID.to_string(),
            scene_id: DEFAULT_SCENE_ID.to_string(),
            etag: String::new(),
        }
    }
}

// =============================================================================
// Controls
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonControl {
    pub control_id: String,
    pub scene_id: String,
    pub disabled: bool,
    pub help_text: String,
    pub etag: String,
    /// Spark cost per press.
    pub cost: u32,
    /// Epoch milliseconds; zero when no cooldown is active.
    pub cooldown_expiration_ms: i64,
    pub progress: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoystickControl {
    pub control_id: String,
    pub scene_id: String,
    pub disabled: bool,
    pub help_text: String,
    pub etag: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericControl {
    pub control_id: String,
    pub scene_id: String,
    pub disabled: bool,
    pub help_text: String,
    pub etag: String,
}

/// A control of any kind. One list owns these; `buttons`/`joysticks` getters
/// are filtered projections.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Button(ButtonControl),
    Joystick(JoystickControl),
    Generic(GenericControl),
}

impl Control {
    pub(crate) fn from_data(data: &ControlData, scene_id: &str) -> Self {
        let scene_id = if data.scene_id.is_empty() {
            scene_id.to_string()
        } else {
            data.scene_id.clone()
        };
        match data.kind {
            ControlKind::Button => Control::Button(ButtonControl {
                control_id: data.control_id.clone(),
                scene_id,
                disabled: data.disabled,
                help_text: data.help_text.clone(),
                etag: data.etag.clone(),
                cost: data.cost.unwrap_or(0),
                cooldown_expiration_ms: data.cooldown.unwrap_or(0),
                progress: data.progress.unwrap_or(0.0),
                text: data.text.clone().unwrap_or_default(),
            }),
            ControlKind::Joystick => Control::Joystick(JoystickControl {
                control_id: data.control_id.clone(),
                scene_id,
                disabled: data.disabled,
                help_text: data.help_text.clone(),
                etag: data.etag.clone(),
            }),
            ControlKind::Generic => Control::Generic(GenericControl {
                control_id: data.control_id.clone(),
                scene_id,
                disabled: data.disabled,
                help_text: data.help_text.clone(),
                etag: data.etag.clone(),
            }),
        }
    }

    pub(crate) fn to_data(&self) -> ControlData {
        match self {
            Control::Button(b) => ControlData {
                control_id: b.control_id.clone(),
                kind: ControlKind::Button,
                scene_id: b.scene_id.clone(),
                disabled: b.disabled,
                help_text: b.help_text.clone(),
                etag: b.etag.clone(),
                cost: Some(b.cost),
                cooldown: Some(b.cooldown_expiration_ms),
                progress: Some(b.progress),
                text: Some(b.text.clone()),
            },
            Control::Joystick(j) => ControlData {
                control_id: j.control_id.clone(),
                kind: ControlKind::Joystick,
                scene_id: j.scene_id.clone(),
                disabled: j.disabled,
                help_text: j.help_text.clone(),
                etag: j.etag.clone(),
                cost: None,
                cooldown: None,
                progress: None,
                text: None,
            },
            Control::Generic(g) => ControlData {
                control_id: g.control_id.clone(),
                kind: ControlKind::Generic,
                scene_id: g.scene_id.clone(),
                disabled: g.disabled,
                help_text: g.help_text.clone(),
                etag: g.etag.clone(),
                cost: None,
                cooldown: None,
                progress: None,
                text: None,
            },
        }
    }

    pub fn control_id(&self) -> &str {
        match self {
            Control::Button(b) => &b.control_id,
            Control::Joystick(j) => &j.control_id,
            Control::Generic(g) => &g.control_id,
        }
    }

    pub fn scene_id(&self) -> &str {
        match self {
            Control::Button(b) => &b.scene_id,
            Control::Joystick(j) => &j.scene_id,
            Control::Generic(g) => &g.scene_id,
        }
    }

    pub fn etag(&self) -> &str {
        match self {
            Control::Button(b) => &b.etag,
            Control::Joystick(j) => &j.etag,
            Control::Generic(g) => &g.etag,
        }
    }

    pub fn disabled(&self) -> bool {
        match self {
            Control::Button(b) => b.disabled,
            Control::Joystick(j) => j.disabled,
            Control::Generic(g) => g.disabled,
        }
    }

    pub(crate) fn set_disabled(&mut self, disabled: bool) {
        match self {
            Control::Button(b) => b.disabled = disabled,
            Control::Joystick(j) => j.disabled = disabled,
            Control::Generic(g) => g.disabled = disabled,
        }
    }

    pub fn as_button(&self) -> Option<&ButtonControl> {
        match self {
            Control::Button(b) => Some(b),
            _ => None,
        }
    }

    pub(crate) fn as_button_mut(&mut self) -> Option<&mut ButtonControl> {
        match self {
            Control::Button(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_joystick(&self) -> Option<&JoystickControl> {
        match self {
            Control::Joystick(j) => Some(j),
            _ => None,
        }
    }
}

// =============================================================================
// Participants
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantState {
    Joined,
    /// Left participants stay in the list so their last-known metadata
    /// remains queryable.
    Left,
    InputDisabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub session_id: String,
    pub user_id: u32,
    pub username: String,
    pub level: u32,
    pub group_id: String,
    /// Epoch milliseconds.
    pub connected_at: u64,
    /// Epoch milliseconds.
    pub last_input_at: u64,
    pub input_disabled: bool,
    pub state: ParticipantState,
    pub etag: String,
}

impl Participant {
    pub(crate) fn from_data(data: &ParticipantData, state: ParticipantState) -> Self {
        Self {
            session_id: data.session_id.clone(),
            user_id: data.user_id,
            username: data.username.clone(),
            level: data.level,
            group_id: data.group_id.clone(),
            connected_at: data.connected_at,
            last_input_at: data.last_input_at,
            input_disabled: data.input_disabled,
            state,
            etag: data.etag.clone(),
        }
    }

    /// Whole-object supersede: every field of the incoming payload wins.
    pub(crate) fn apply(&mut self, data: &ParticipantData) {
        self.session_id = data.session_id.clone();
        self.username = data.username.clone();
        self.level = data.level;
        self.group_id = data.group_id.clone();
        self.connected_at = data.connected_at;
        self.last_input_at = data.last_input_at;
        self.input_disabled = data.input_disabled;
        self.etag = data.etag.clone();
    }

    pub(crate) fn to_data(&self) -> ParticipantData {
        ParticipantData {
            session_id: self.session_id.clone(),
            user_id: self.user_id,
            username: self.username.clone(),
            level: self.level,
            group_id: self.group_id.clone(),
            connected_at: self.connected_at,
            last_input_at: self.last_input_at,
            input_disabled: self.input_disabled,
            etag: self.etag.clone(),
        }
    }
}
