//! Pacing: how long the sender pauses after each line.
//!
//!   delay = chars(message) * per_char + base
//!
//! Longer lines take longer to type out and read on the overlay, so the
//! next line waits proportionally. There is no feedback from the receiver.

use std::time::Duration;

use crate::config::SenderConfig;

const PER_CHAR_SECS: f64 = 0.1;
const BASE_SECS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingPolicy {
    per_char_secs: f64,
    base_secs: f64,
}

impl PacingPolicy {
    /// Negative or non-finite inputs are clamped to zero.
    pub fn new(per_char_secs: f64, base_secs: f64) -> Self {
        Self {
            per_char_secs: sanitize(per_char_secs),
            base_secs: sanitize(base_secs),
        }
    }

    pub fn from_config(config: &SenderConfig) -> Self {
        Self::new(config.per_char_delay_secs, config.base_delay_secs)
    }

    /// Pause owed after sending `message`. Length counts characters, not bytes.
    pub fn delay_for(&self, message: &str) -> Duration {
        let len = message.chars().count() as f64;
        Duration::from_secs_f64(len * self.per_char_secs + self.base_secs)
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::new(PER_CHAR_SECS, BASE_SECS)
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}
