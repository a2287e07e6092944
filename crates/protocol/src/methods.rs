//! Method-name table for both directions of the connection.

/// Methods the client sends to the service.
pub mod client {
    pub const GET_GROUPS: &str = "getGroups";
    pub const GET_SCENES: &str = "getScenes";
    pub const GET_ALL_PARTICIPANTS: &str = "getAllParticipants";
    pub const SET_CURRENT_SCENE: &str = "setCurrentScene";
    pub const UPDATE_GROUPS: &str = "updateGroups";
    pub const UPDATE_SCENES: &str = "updateScenes";
    pub const UPDATE_CONTROLS: &str = "updateControls";
    pub const UPDATE_PARTICIPANTS: &str = "updateParticipants";
    pub const READY: &str = "ready";
    pub const CAPTURE: &str = "capture";
    pub const CREATE_GROUPS: &str = "createGroups";
    pub const SET_COMPRESSION: &str = "setCompression";
    pub const SET_JOYSTICK_COORDINATES: &str = "setJoystickCoordinates";
    pub const SET_BUTTON_CONTROL_PROPERTIES: &str = "setButtonControlProperties";
}

/// Methods the service pushes to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMethod {
    Hello,
    ParticipantJoin,
    ParticipantLeave,
    ParticipantUpdate,
    GroupCreate,
    GroupUpdate,
    SceneCreate,
    ControlUpdate,
    Ready,
    GiveInput,
}

impl ServerMethod {
    /// Resolve a pushed method name. Unknown names return `None` and are
    /// ignored by the caller.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hello" => Some(Self::Hello),
            "onParticipantJoin" => Some(Self::ParticipantJoin),
            "onParticipantLeave" => Some(Self::ParticipantLeave),
            "onParticipantUpdate" => Some(Self::ParticipantUpdate),
            "onGroupCreate" => Some(Self::GroupCreate),
            "onGroupUpdate" => Some(Self::GroupUpdate),
            "onSceneCreate" => Some(Self::SceneCreate),
            "onControlUpdate" => Some(Self::ControlUpdate),
            "onReady" => Some(Self::Ready),
            "giveInput" => Some(Self::GiveInput),
            _ => None,
        }
    }
}
