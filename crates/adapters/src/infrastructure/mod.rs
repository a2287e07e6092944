//! Production infrastructure adapters.

mod http;
mod socket;
mod storage;
mod timers;

pub use http::ReqwestHttpClient;
pub use socket::TungsteniteSocket;
pub use storage::FileStorage;
pub use timers::TokioTimerService;
