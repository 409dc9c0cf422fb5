//! Broadcast payload posted to the overlay endpoint.
//!
//! The overlay renders each payload as one animated line of text. Field
//! names on the wire are camelCase; `type` is always `"danmu"`.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Payload discriminator understood by the overlay.
pub const PAYLOAD_TYPE: &str = "danmu";

/// Presentation attributes shared by every line of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DanmuStyle {
    /// CSS color of the glyphs.
    pub color: String,
    /// Font size in px.
    pub size: u32,
    pub stroke_color: String,
    pub stroke_width: u32,
    /// Characters per second of the typing animation.
    pub typing_speed: u32,
    /// Milliseconds the finished line stays on screen.
    pub display_duration: u32,
    /// Milliseconds of the fade-out.
    pub fade_duration: u32,
    pub shake_amplitude: u32,
    /// Maximum tilt in degrees, chosen at random per line.
    pub random_tilt: u32,
}

impl Default for DanmuStyle {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            size: 32,
            stroke_color: "#ffffff".to_string(),
            stroke_width: 2,
            typing_speed: 100,
            display_duration: 2000,
            fade_duration: 1000,
            shake_amplitude: 2,
            random_tilt: 10,
        }
    }
}

/// One line ready to post. Built per send and dropped right after.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastPayload<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    #[serde(flatten)]
    pub style: &'a DanmuStyle,
    /// Unix time in seconds, captured when the payload was built.
    pub time: f64,
}

impl<'a> BroadcastPayload<'a> {
    /// Build a payload stamped with the current wall-clock time.
    pub fn new(text: &'a str, style: &'a DanmuStyle) -> Self {
        Self::at(text, style, unix_now_secs())
    }

    /// Build a payload with an explicit timestamp.
    pub fn at(text: &'a str, style: &'a DanmuStyle, time: f64) -> Self {
        Self {
            kind: PAYLOAD_TYPE,
            text,
            style,
            time,
        }
    }
}

/// Seconds since the Unix epoch as a float. A clock before 1970 reads as 0.
pub fn unix_now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
