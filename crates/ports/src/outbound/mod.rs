//! Outbound ports - capabilities the client consumes.

mod http;
mod socket;
mod storage;
mod timer;

pub use http::{HttpError, HttpMethod, HttpPort, HttpRequest, HttpResponse};
pub use socket::{SocketError, SocketEvent, SocketEventSender, SocketPort};
pub use storage::StorageProvider;
pub use timer::{TimerCallback, TimerPort};
