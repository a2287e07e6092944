//! In-memory mirror of the service's scenes, groups, controls, participants
//!
//! Mutated only from the consumer thread, inside `do_work`. The well-known
//! `default` group and scene are seeded at construction and re-seeded after a
//! wholesale replace, so lookups never have to fail for them.

use serde_json::{json, Value};

use stagelink_protocol::{
    ControlData, GroupData, ParticipantData, SceneData, DEFAULT_GROUP_ID, DEFAULT_SCENE_ID,
};

use crate::error::ClientError;
use crate::model::{
    ButtonControl, Control, Group, JoystickControl, Participant, ParticipantState, Scene,
};

/// Cooldowns below this read like a seconds/milliseconds mix-up.
const COOLDOWN_HINT_THRESHOLD_MS: i64 = 1000;

pub(crate) struct WorldMirror {
    scenes: Vec<Scene>,
    groups: Vec<Group>,
    controls: Vec<Control>,
    participants: Vec<Participant>,
}

impl WorldMirror {
    pub fn new() -> Self {
        let mut mirror = Self {
            scenes: Vec::new(),
            groups: Vec::new(),
            controls: Vec::new(),
            participants: Vec::new(),
        };
        mirror.ensure_defaults();
        mirror
    }

    fn ensure_defaults(&mut self) {
        if self.scene(DEFAULT_SCENE_ID).is_none() {
            self.scenes.push(Scene::default_scene());
        }
        if self.group(DEFAULT_GROUP_ID).is_none() {
            self.groups.push(Group::default_group());
        }
    }

    pub fn reset(&mut self) {
        self.scenes.clear();
        self.groups.clear();
        self.controls.clear();
        self.participants.clear();
        self.ensure_defaults();
    }

    // =========================================================================
    // Scenes
    // =========================================================================

    /// Bulk `getScenes` result: the scene list is replaced wholesale, and so
    /// are all controls.
    pub fn replace_scenes(&mut self, scenes: &[SceneData]) {
        self.scenes.clear();
        self.controls.clear();
        for data in scenes {
            self.insert_scene(data);
        }
        self.ensure_defaults();
    }

    /// `onSceneCreate` appends.
    pub fn add_scene(&mut self, data: &SceneData) {
        if let Some(existing) = self.scenes.iter_mut().find(|s| s.scene_id == data.scene_id) {
            *existing = Scene::from_data(data);
            self.update_controls(&data.scene_id, &data.controls);
        } else {
            self.insert_scene(data);
        }
    }

    fn insert_scene(&mut self, data: &SceneData) {
        self.scenes.push(Scene::from_data(data));
        for control in &data.controls {
            self.upsert_control(control, &data.scene_id);
        }
    }

    pub fn scene(&self, scene_id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.scene_id == scene_id)
    }

    pub fn scenes(&self) -> Vec<Scene> {
        self.scenes.clone()
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Present -> overwrite, absent -> append.
    pub fn apply_group(&mut self, data: &GroupData) {
        match self.groups.iter_mut().find(|g| g.group_id == data.group_id) {
            Some(group) => *group = Group::from_data(data),
            None => self.groups.push(Group::from_data(data)),
        }
    }

    pub fn group(&self, group_id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }

    /// Never fails: an unacknowledged group resolves to an ephemeral default.
    pub fn group_or_default(&self, group_id: &str) -> Group {
        self.group(group_id).cloned().unwrap_or_else(|| Group {
            group_id: group_id.to_string(),
            ..Group::default_group()
        })
    }

    /// Scene currently bound to a group; an ephemeral default scene when the
    /// service has not acknowledged either yet.
    pub fn current_scene(&self, group_id: &str) -> Scene {
        let group = self.group_or_default(group_id);
        self.scene(&group.scene_id)
            .cloned()
            .unwrap_or_else(Scene::default_scene)
    }

    pub fn groups(&self) -> Vec<Group> {
        self.groups.clone()
    }

    // =========================================================================
    // Controls
    // =========================================================================

    /// `onControlUpdate` / control setters: match by id, drop the old object,
    /// insert the new one.
    pub fn update_controls(&mut self, scene_id: &str, controls: &[ControlData]) {
        for data in controls {
            self.upsert_control(data, scene_id);
        }
    }

    fn upsert_control(&mut self, data: &ControlData, scene_id: &str) {
        self.controls.retain(|c| c.control_id() != data.control_id);
        self.controls.push(Control::from_data(data, scene_id));
    }

    pub fn control(&self, control_id: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.control_id() == control_id)
    }

    pub(crate) fn control_mut(&mut self, control_id: &str) -> Option<&mut Control> {
        self.controls
            .iter_mut()
            .find(|c| c.control_id() == control_id)
    }

    pub fn controls(&self) -> Vec<Control> {
        self.controls.clone()
    }

    pub fn controls_for_scene(&self, scene_id: &str) -> Vec<Control> {
        self.controls
            .iter()
            .filter(|c| c.scene_id() == scene_id)
            .cloned()
            .collect()
    }

    pub fn buttons(&self) -> Vec<ButtonControl> {
        self.controls
            .iter()
            .filter_map(|c| c.as_button())
            .cloned()
            .collect()
    }

    pub fn joysticks(&self) -> Vec<JoystickControl> {
        self.controls
            .iter()
            .filter_map(|c| c.as_joystick())
            .cloned()
            .collect()
    }

    // =========================================================================
    // Participants
    // =========================================================================

    /// Bulk `getAllParticipants` result.
    pub fn replace_participants(&mut self, participants: &[ParticipantData]) {
        for data in participants {
            self.apply_join(data);
        }
    }

    /// Upsert keyed by `user_id`; re-joins revive the existing entry.
    pub fn apply_join(&mut self, data: &ParticipantData) -> Participant {
        match self
            .participants
            .iter_mut()
            .find(|p| p.user_id == data.user_id)
        {
            Some(participant) => {
                participant.apply(data);
                participant.state = ParticipantState::Joined;
                participant.clone()
            }
            None => {
                let participant = Participant::from_data(data, ParticipantState::Joined);
                self.participants.push(participant.clone());
                participant
            }
        }
    }

    /// Marks matching entries `Left` without removing them.
    pub fn apply_leave(&mut self, data: &ParticipantData) -> Vec<Participant> {
        let mut left = Vec::new();
        for participant in self
            .participants
            .iter_mut()
            .filter(|p| p.user_id == data.user_id)
        {
            participant.state = ParticipantState::Left;
            left.push(participant.clone());
        }
        left
    }

    pub fn apply_update(&mut self, data: &ParticipantData) -> Participant {
        match self
            .participants
            .iter_mut()
            .find(|p| p.user_id == data.user_id)
        {
            Some(participant) => {
                participant.apply(data);
                if data.input_disabled {
                    participant.state = ParticipantState::InputDisabled;
                } else if participant.state == ParticipantState::InputDisabled {
                    participant.state = ParticipantState::Joined;
                }
                participant.clone()
            }
            None => {
                let state = if data.input_disabled {
                    ParticipantState::InputDisabled
                } else {
                    ParticipantState::Joined
                };
                let participant = Participant::from_data(data, state);
                self.participants.push(participant.clone());
                participant
            }
        }
    }

    pub fn participant_by_session(&self, session_id: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.session_id == session_id)
    }

    pub fn participant_by_user(&self, user_id: u32) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub(crate) fn touch_input(&mut self, session_id: &str, now_ms: u64) {
        if let Some(participant) = self
            .participants
            .iter_mut()
            .find(|p| p.session_id == session_id)
        {
            participant.last_input_at = now_ms;
        }
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.participants.clone()
    }

    // =========================================================================
    // Cooldowns
    // =========================================================================

    /// Stamp a cooldown on a local button and build the `updateControls`
    /// params announcing it.
    pub fn trigger_cooldown(
        &mut self,
        control_id: &str,
        cooldown_ms: i64,
        now_ms: i64,
    ) -> Result<Value, ClientError> {
        if cooldown_ms < COOLDOWN_HINT_THRESHOLD_MS {
            tracing::info!(
                "cooldown of {} ms on {} is under a second; was this meant to be seconds?",
                cooldown_ms,
                control_id
            );
        }
        let expiration = now_ms + cooldown_ms;
        let control = self
            .control_mut(control_id)
            .ok_or_else(|| ClientError::UnknownControl(control_id.to_string()))?;
        let button = control
            .as_button_mut()
            .ok_or_else(|| ClientError::NotAButton(control_id.to_string()))?;
        button.cooldown_expiration_ms = expiration;

        let scene_id = button.scene_id.clone();
        let data = Control::Button(button.clone()).to_data();
        Ok(json!({"sceneID": scene_id, "controls": [data]}))
    }
}
