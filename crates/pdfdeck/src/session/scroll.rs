//! Manual scrolling of a page pair left half-overlapping by a `partial_sliding` run.

use std::time::{Duration, Instant};

use crate::geometry::centered;
use crate::render::transition::partial_rest;

/// Pixels moved per step.
pub const SCROLL_STEP: f32 = 10.0;
/// Minimum time between steps while a scroll key is held.
pub const SCROLL_REPEAT: Duration = Duration::from_millis(100);

/// Vertical offsets of the two stacked pages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialLayout {
    /// Page shown above (the one navigated away from).
    pub upper: usize,
    /// Page shown below (the current page).
    pub lower: usize,
    pub prev_slide_position: f32,
    pub next_slide_position: f32,
}

impl PartialLayout {
    /// Offsets right after the forward run into `lower` finished.
    pub fn resting(upper: usize, lower: usize, window_height: i32, upper_height: i32) -> Self {
        let (prev_slide_position, next_slide_position) = partial_rest(window_height, upper_height);
        Self {
            upper,
            lower,
            prev_slide_position,
            next_slide_position,
        }
    }

    /// Move both pages one step. `direction > 0` scrolls the lower page up toward its
    /// centered position and stops there; `direction < 0` scrolls back down without limit.
    /// Returns whether anything moved.
    pub fn step(
        &mut self,
        direction: i8,
        window_height: i32,
        upper_height: i32,
        lower_height: i32,
    ) -> bool {
        let delta = match direction.signum() {
            1 => {
                let end_pos = centered(lower_height, window_height) as f32;
                (self.next_slide_position - end_pos).clamp(0.0, SCROLL_STEP)
            }
            -1 => -SCROLL_STEP,
            _ => 0.0,
        };
        if delta == 0.0 {
            return false;
        }
        self.prev_slide_position -= delta;
        self.next_slide_position = self.prev_slide_position + upper_height as f32;
        true
    }

    /// Whether the lower page has reached its centered position.
    pub fn is_closed(&self, window_height: i32, lower_height: i32) -> bool {
        self.next_slide_position <= centered(lower_height, window_height) as f32
    }
}

/// Held-key scrolling: a key-down arms it, the frame loop polls it, key-up disarms it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollState {
    pub active: bool,
    pub direction: i8,
    last_step: Option<Instant>,
}

impl ScrollState {
    pub fn press(&mut self, direction: i8) {
        self.active = true;
        self.direction = direction.signum();
    }

    pub fn release(&mut self) {
        self.active = false;
        self.direction = 0;
    }

    /// Direction to step in at `now`, if a step is due.
    pub fn poll(&mut self, now: Instant) -> Option<i8> {
        if !self.active || self.direction == 0 {
            return None;
        }
        let due = self
            .last_step
            .is_none_or(|last| now.saturating_duration_since(last) > SCROLL_REPEAT);
        if !due {
            return None;
        }
        self.last_step = Some(now);
        Some(self.direction)
    }
}
