//! Frame envelope for the interactive WebSocket connection
//!
//! Both directions use the same envelope. Client frames look like
//! `{"type":"method","id":0,"method":"getScenes","params":{}}`; server frames
//! arrive either as another `method` frame (a push) or as a `reply` frame
//! correlated by `id`.
//!
//! The method name is carried under the key `method` - the same word as the
//! `type` tag value. That oddity is load-bearing for wire compatibility and is
//! preserved on write; on read the legacy alias `name` is accepted as well.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single frame in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    Method(MethodFrame),
    Reply(ReplyFrame),
}

/// A method frame: a client RPC or a server push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodFrame {
    /// Correlation id. Server pushes may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(alias = "name")]
    pub method: String,
    #[serde(default)]
    pub params: Value,
    /// Server hint that no reply is expected for this frame.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub discard: bool,
}

/// A reply frame correlated to an earlier method frame by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyFrame {
    pub id: u32,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
}

/// Error object embedded in a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyError {
    pub code: u32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parse one text frame. Unknown keys and extra members are ignored; a frame
/// that is not valid JSON or is missing the envelope keys is an error the
/// caller logs and drops.
pub fn read_frame(text: &str) -> Result<Frame, FrameError> {
    Ok(serde_json::from_str(text)?)
}

/// Serialize a frame into its canonical wire form.
pub fn write_frame(frame: &Frame) -> String {
    // The envelope contains no non-string map keys, so serialization cannot
    // fail; an empty frame is still a valid object.
    serde_json::to_string(frame).unwrap_or_default()
}

impl Frame {
    /// Build a client method frame.
    pub fn method(id: u32, method: impl Into<String>, params: Value) -> Self {
        Frame::Method(MethodFrame {
            id: Some(id),
            method: method.into(),
            params,
            discard: false,
        })
    }
}

impl ReplyError {
    /// Human-readable composition used when surfacing reply errors to hosts.
    pub fn composed_message(&self) -> String {
        match &self.path {
            Some(path) => format!("{} (code {}, path {})", self.message, self.code, path),
            None => format!("{} (code {})", self.message, self.code),
        }
    }
}
