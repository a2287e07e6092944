//! Timer Port - named periodic timers driving the auth and reconnect loops
//!
//! The client uses three timers (`check_auth_status`, `refresh_short_code`,
//! `reconnect`). Fires are reported through the bound callback, which only
//! enqueues into the client's event queue; the work itself runs on the
//! consumer tick, so no two timer callbacks ever overlap.

use std::sync::Arc;
use std::time::Duration;

/// Invoked with the timer name on every fire.
pub type TimerCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Named-timer capability.
pub trait TimerPort: Send + Sync {
    /// Wire the fire callback. Called once by the client before any `start`.
    fn bind(&self, on_fire: TimerCallback);

    /// Start a periodic timer. Starting a name that is already running
    /// replaces it.
    fn start(&self, name: &str, interval: Duration);

    /// Stop one timer. Unknown names are ignored.
    fn stop(&self, name: &str);

    /// Stop every running timer.
    fn stop_all(&self);
}
