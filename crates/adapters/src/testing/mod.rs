//! Test doubles for the client's ports
//!
//! These mocks belong in the adapters layer (not ports) because:
//! 1. They are concrete implementations of port traits
//! 2. Mocks are infrastructure concerns, not interface definitions
//! 3. Test utilities should be close to the implementations they mock

mod http;
mod socket;
mod storage;
mod timers;

pub use http::ScriptedHttpPort;
pub use socket::RecordingSocketPort;
pub use storage::MemoryStorage;
pub use timers::ManualTimers;
