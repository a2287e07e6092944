//! Stagelink Adapters - concrete implementations of the client's ports
//!
//! Production code lives under [`infrastructure`]; recording/scripted test
//! doubles live under [`testing`] so the client crate and host applications
//! can drive the facade without any network.

pub mod infrastructure;
pub mod testing;

pub use infrastructure::{FileStorage, ReqwestHttpClient, TokioTimerService, TungsteniteSocket};
