//! Named periodic timers on the tokio runtime

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use stagelink_ports::{TimerCallback, TimerPort};

/// One spawned interval loop per running timer name. `start` on a running
/// name aborts the old loop first, so replacement is atomic from the
/// caller's point of view.
pub struct TokioTimerService {
    runtime: Handle,
    on_fire: Mutex<Option<TimerCallback>>,
    handles: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioTimerService {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            on_fire: Mutex::new(None),
            handles: Mutex::new(HashMap::new()),
        }
    }
}

impl Drop for TokioTimerService {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl TimerPort for TokioTimerService {
    fn bind(&self, on_fire: TimerCallback) {
        let mut slot = self.on_fire.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(on_fire);
    }

    fn start(&self, name: &str, interval: Duration) {
        let on_fire = {
            let slot = self.on_fire.lock().unwrap_or_else(|p| p.into_inner());
            match slot.as_ref() {
                Some(cb) => Arc::clone(cb),
                None => {
                    tracing::error!("timer {} started before bind, ignoring", name);
                    return;
                }
            }
        };

        let mut handles = self.handles.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(old) = handles.remove(name) {
            old.abort();
        }

        let timer_name = name.to_string();
        let handle = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                on_fire(&timer_name);
            }
        });
        handles.insert(name.to_string(), handle);
    }

    fn stop(&self, name: &str) {
        let mut handles = self.handles.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = handles.remove(name) {
            handle.abort();
        }
    }

    fn stop_all(&self) {
        let mut handles = self.handles.lock().unwrap_or_else(|p| p.into_inner());
        for (_, handle) in handles.drain() {
            handle.abort();
        }
    }
}
