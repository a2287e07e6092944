//! Stagelink Protocol - wire types for the interactive service connection
//!
//! This crate contains everything that crosses the WebSocket between a game
//! client and the interactive service:
//! - The frame envelope (`method` and `reply` frames) and its codec
//! - The method-name table for server pushes and client RPCs
//! - Entity payloads (scenes, groups, controls, participants, input)
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json, and thiserror
//! 2. **No business logic** - Pure data types and serialization
//! 3. **Tolerant reads** - Unknown keys and unknown method names never fail
//!    a parse; removing a recognized key is a breaking change

pub mod frames;
pub mod methods;
pub mod types;

pub use frames::{read_frame, write_frame, Frame, FrameError, MethodFrame, ReplyError, ReplyFrame};
pub use methods::ServerMethod;
pub use types::{
    input_events, ControlData, ControlKind, GiveInputParams, GroupData, HostEntry, InputData,
    ParticipantData, SceneData, DEFAULT_GROUP_ID, DEFAULT_SCENE_ID,
};
