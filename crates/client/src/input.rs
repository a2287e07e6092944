//! Per-tick input state machine
//!
//! Button events accumulate into triple-buffered counters keyed by
//! `(user_id, control_id)` and, in aggregate, by control. The pump shifts the
//! buffers once per tick (`previous := current; current := next; next := 0`),
//! so an edge query answers true for exactly one tick per press. Joystick
//! moves fold into a cumulative mean for smoothing.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EdgeCounter {
    previous: u32,
    current: u32,
    next: u32,
}

impl EdgeCounter {
    fn shift(&mut self) {
        self.previous = self.current;
        self.current = self.next;
        self.next = 0;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ButtonState {
    pub is_down: bool,
    pub is_pressed: bool,
    pub is_up: bool,
    downs: EdgeCounter,
    presses: EdgeCounter,
    ups: EdgeCounter,
}

impl ButtonState {
    fn apply(&mut self, pressed: bool) {
        let was_previously_pressed = self.presses.next > 0;
        if pressed {
            self.is_down = !was_previously_pressed;
            self.is_pressed = true;
            self.is_up = false;
        } else {
            self.is_down = false;
            self.is_pressed = false;
            self.is_up = true;
        }

        if self.is_down {
            self.downs.next += 1;
        }
        if self.is_pressed {
            self.presses.next += 1;
        }
        if self.is_up {
            self.ups.next += 1;
        }
    }

    fn shift(&mut self) {
        self.downs.shift();
        self.presses.shift();
        self.ups.shift();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct JoystickState {
    pub x: f64,
    pub y: f64,
    pub input_count: u32,
}

impl JoystickState {
    fn apply(&mut self, x: f64, y: f64) {
        self.input_count += 1;
        let n = f64::from(self.input_count);
        self.x = self.x * ((n - 1.0) / n) + x / n;
        self.y = self.y * ((n - 1.0) / n) + y / n;
    }
}

#[derive(Default)]
pub(crate) struct InputAggregator {
    buttons_by_user: HashMap<(u32, String), ButtonState>,
    buttons_by_control: HashMap<String, ButtonState>,
    joysticks_by_user: HashMap<(u32, String), JoystickState>,
    joysticks_by_control: HashMap<String, JoystickState>,
}

impl InputAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.buttons_by_user.clear();
        self.buttons_by_control.clear();
        self.joysticks_by_user.clear();
        self.joysticks_by_control.clear();
    }

    pub fn apply_button(&mut self, user_id: u32, control_id: &str, pressed: bool) {
        self.buttons_by_user
            .entry((user_id, control_id.to_string()))
            .or_default()
            .apply(pressed);
        self.buttons_by_control
            .entry(control_id.to_string())
            .or_default()
            .apply(pressed);
    }

    pub fn apply_joystick(&mut self, user_id: u32, control_id: &str, x: f64, y: f64) {
        self.joysticks_by_user
            .entry((user_id, control_id.to_string()))
            .or_default()
            .apply(x, y);
        self.joysticks_by_control
            .entry(control_id.to_string())
            .or_default()
            .apply(x, y);
    }

    /// The once-per-tick rotation. Runs only while interactivity is enabled.
    pub fn shift_frame(&mut self) {
        for state in self.buttons_by_user.values_mut() {
            state.shift();
        }
        for state in self.buttons_by_control.values_mut() {
            state.shift();
        }
    }

    fn user_buttons(&self, control_id: &str, user_id: u32) -> Option<&ButtonState> {
        self.buttons_by_user
            .get(&(user_id, control_id.to_string()))
    }

    // =========================================================================
    // Per-participant queries
    // =========================================================================

    pub fn button_down(&self, control_id: &str, user_id: u32) -> bool {
        self.count_of_button_downs(control_id, user_id) > 0
    }

    pub fn button_pressed(&self, control_id: &str, user_id: u32) -> bool {
        self.count_of_button_presses(control_id, user_id) > 0
    }

    pub fn button_up(&self, control_id: &str, user_id: u32) -> bool {
        self.count_of_button_ups(control_id, user_id) > 0
    }

    pub fn count_of_button_downs(&self, control_id: &str, user_id: u32) -> u32 {
        self.user_buttons(control_id, user_id)
            .map_or(0, |s| s.downs.current)
    }

    pub fn count_of_button_presses(&self, control_id: &str, user_id: u32) -> u32 {
        self.user_buttons(control_id, user_id)
            .map_or(0, |s| s.presses.current)
    }

    pub fn count_of_button_ups(&self, control_id: &str, user_id: u32) -> u32 {
        self.user_buttons(control_id, user_id)
            .map_or(0, |s| s.ups.current)
    }

    pub fn joystick_x(&self, control_id: &str, user_id: u32) -> f64 {
        self.joysticks_by_user
            .get(&(user_id, control_id.to_string()))
            .map_or(0.0, |s| s.x)
    }

    pub fn joystick_y(&self, control_id: &str, user_id: u32) -> f64 {
        self.joysticks_by_user
            .get(&(user_id, control_id.to_string()))
            .map_or(0.0, |s| s.y)
    }

    // =========================================================================
    // Aggregate (any participant) queries
    // =========================================================================

    pub fn any_button_down(&self, control_id: &str) -> bool {
        self.total_button_downs(control_id) > 0
    }

    pub fn any_button_pressed(&self, control_id: &str) -> bool {
        self.total_button_presses(control_id) > 0
    }

    pub fn any_button_up(&self, control_id: &str) -> bool {
        self.total_button_ups(control_id) > 0
    }

    pub fn total_button_downs(&self, control_id: &str) -> u32 {
        self.buttons_by_control
            .get(control_id)
            .map_or(0, |s| s.downs.current)
    }

    pub fn total_button_presses(&self, control_id: &str) -> u32 {
        self.buttons_by_control
            .get(control_id)
            .map_or(0, |s| s.presses.current)
    }

    pub fn total_button_ups(&self, control_id: &str) -> u32 {
        self.buttons_by_control
            .get(control_id)
            .map_or(0, |s| s.ups.current)
    }

    pub fn average_joystick_x(&self, control_id: &str) -> f64 {
        self.joysticks_by_control
            .get(control_id)
            .map_or(0.0, |s| s.x)
    }

    pub fn average_joystick_y(&self, control_id: &str) -> f64 {
        self.joysticks_by_control
            .get(control_id)
            .map_or(0.0, |s| s.y)
    }

    /// Leftover accumulation is visible to tests: every `next` bucket must be
    /// zero right after a shift.
    #[cfg(test)]
    fn pending(&self, control_id: &str, user_id: u32) -> (u32, u32, u32) {
        self.user_buttons(control_id, user_id)
            .map_or((0, 0, 0), |s| (s.downs.next, s.presses.next, s.ups.next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_is_down_for_exactly_one_tick() {
        let mut input = InputAggregator::new();
        input.apply_button(7, "b", true);

        input.shift_frame();
        assert!(input.button_down("b", 7));
        assert!(input.button_pressed("b", 7));
        assert!(!input.button_up("b", 7));

        input.shift_frame();
        assert!(!input.button_down("b", 7));
        assert!(!input.button_pressed("b", 7));
        assert_eq!(input.count_of_button_presses("b", 7), 0);
    }

    #[test]
    fn test_held_press_is_pressed_but_not_down() {
        let mut input = InputAggregator::new();
        input.apply_button(7, "b", true);
        input.apply_button(7, "b", true);

        input.shift_frame();
        assert_eq!(input.count_of_button_downs("b", 7), 1);
        assert_eq!(input.count_of_button_presses("b", 7), 2);
    }

    #[test]
    fn test_release_counts_as_up() {
        let mut input = InputAggregator::new();
        input.apply_button(7, "b", true);
        input.apply_button(7, "b", false);

        input.shift_frame();
        assert!(input.button_up("b", 7));
        assert_eq!(input.count_of_button_ups("b", 7), 1);
        assert_eq!(input.count_of_button_downs("b", 7), 1);
    }

    #[test]
    fn test_next_buckets_are_zero_after_shift() {
        let mut input = InputAggregator::new();
        input.apply_button(7, "b", true);
        input.apply_button(7, "b", false);
        input.shift_frame();
        assert_eq!(input.pending("b", 7), (0, 0, 0));
    }

    #[test]
    fn test_aggregate_counts_span_users() {
        let mut input = InputAggregator::new();
        input.apply_button(1, "b", true);
        input.apply_button(2, "b", true);

        input.shift_frame();
        assert_eq!(input.count_of_button_downs("b", 1), 1);
        assert_eq!(input.total_button_downs("b"), 2);
        assert!(input.any_button_pressed("b"));
        assert!(!input.any_button_down("other"));
    }

    #[test]
    fn test_joystick_running_mean_stays_in_float_domain() {
        let mut input = InputAggregator::new();
        input.apply_joystick(7, "j", 1.0, -1.0);
        input.apply_joystick(7, "j", 0.0, 0.0);

        // After two samples the mean is the midpoint, not the integer-divided
        // collapse to the first sample.
        assert!((input.joystick_x("j", 7) - 0.5).abs() < 1e-9);
        assert!((input.joystick_y("j", 7) + 0.5).abs() < 1e-9);

        input.apply_joystick(7, "j", 0.5, 0.5);
        assert!((input.joystick_x("j", 7) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_joystick_mean_aggregates_across_users() {
        let mut input = InputAggregator::new();
        input.apply_joystick(1, "j", 1.0, 0.0);
        input.apply_joystick(2, "j", 0.0, 0.0);

        assert!((input.joystick_x("j", 1) - 1.0).abs() < 1e-9);
        assert!((input.average_joystick_x("j") - 0.5).abs() < 1e-9);
    }
}
