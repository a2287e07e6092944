//! Stagelink Ports - capability traits for the client's I/O seams
//!
//! The client core never touches a socket, an HTTP stack, a disk, or a clock
//! directly; it goes through the object-safe traits in this crate. Concrete
//! implementations live in `stagelink-adapters`, test doubles in
//! `stagelink-adapters::testing`.

pub mod outbound;

pub use outbound::{
    HttpError, HttpMethod, HttpPort, HttpRequest, HttpResponse, SocketError, SocketEvent,
    SocketEventSender, SocketPort, StorageProvider, TimerCallback, TimerPort,
};
