//! Manually-fired timer mock
//!
//! Nothing fires on its own; tests call [`ManualTimers::fire`] to simulate a
//! tick. Started timers are recorded with their intervals so tests can assert
//! on the 500 ms polling and reconnect cadence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stagelink_ports::{TimerCallback, TimerPort};

#[derive(Default)]
struct State {
    on_fire: Option<TimerCallback>,
    active: HashMap<String, Duration>,
    started: Vec<(String, Duration)>,
}

#[derive(Clone, Default)]
pub struct ManualTimers {
    state: Arc<Mutex<State>>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire a timer by name. Does nothing when the timer is not running,
    /// mirroring a real fire that lost the race with `stop`.
    pub fn fire(&self, name: &str) {
        let callback = {
            let state = self.state.lock().unwrap();
            if !state.active.contains_key(name) {
                return;
            }
            state.on_fire.clone()
        };
        if let Some(callback) = callback {
            callback(name);
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.state.lock().unwrap().active.contains_key(name)
    }

    /// Interval of a currently-running timer.
    pub fn interval_of(&self, name: &str) -> Option<Duration> {
        self.state.lock().unwrap().active.get(name).copied()
    }

    /// Every `start` call observed, in order.
    pub fn started(&self) -> Vec<(String, Duration)> {
        self.state.lock().unwrap().started.clone()
    }
}

impl TimerPort for ManualTimers {
    fn bind(&self, on_fire: TimerCallback) {
        self.state.lock().unwrap().on_fire = Some(on_fire);
    }

    fn start(&self, name: &str, interval: Duration) {
        let mut state = self.state.lock().unwrap();
        state.active.insert(name.to_string(), interval);
        state.started.push((name.to_string(), interval));
    }

    fn stop(&self, name: &str) {
        self.state.lock().unwrap().active.remove(name);
    }

    fn stop_all(&self) {
        self.state.lock().unwrap().active.clear();
    }
}
