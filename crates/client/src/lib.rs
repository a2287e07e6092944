//! Stagelink Client - connects a game to the interactive broadcast service
//!
//! The facade ([`InteractiveClient`]) owns every cache and state machine.
//! Network and timer callbacks only enqueue into an internal event queue; the
//! host drains it once per frame with [`InteractiveClient::do_work`], which is
//! where all observable state changes happen.
//!
//! ```no_run
//! use std::sync::Arc;
//! use stagelink_adapters::{FileStorage, ReqwestHttpClient, TokioTimerService, TungsteniteSocket};
//! use stagelink_client::{ClientConfig, ClientPorts, InteractiveClient};
//!
//! # fn run(runtime: tokio::runtime::Handle) -> Result<(), stagelink_client::ClientError> {
//! let ports = ClientPorts {
//!     http: Arc::new(ReqwestHttpClient::new()),
//!     socket: Arc::new(TungsteniteSocket::new()),
//!     storage: Arc::new(FileStorage::new("stagelink-tokens.json")),
//!     timers: Arc::new(TokioTimerService::new(runtime.clone())),
//! };
//! let config = ClientConfig::new("my-app", "my-project-version");
//! let mut client = InteractiveClient::new(config, ports, runtime)?;
//! client.initialize(true)?;
//! loop {
//!     client.do_work();
//!     // render a frame, query button edges, ...
//! }
//! # }
//! ```

mod actions;
mod auth;
mod config;
mod connection;
mod error;
mod events;
mod facade;
mod input;
mod mirror;
mod model;
mod session;

pub use config::{ClientConfig, DEFAULT_API_BASE};
pub use error::{ClientError, ErrorEvent, ErrorKind, DEFAULT_ERROR_CODE};
pub use events::{ButtonEvent, InteractiveEvent, InteractivityState, JoystickEvent};
pub use facade::{ClientPorts, InteractiveClient};
pub use model::{
    ButtonControl, Control, GenericControl, Group, JoystickControl, Participant,
    ParticipantState, Scene,
};
