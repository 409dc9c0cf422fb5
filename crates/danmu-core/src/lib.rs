//! danmu-core: configuration and wire payload types shared by the sender and the probe.

pub mod config;
pub mod pacing;
pub mod payload;

pub use config::{DanmuConfig, ProbeConfig, SenderConfig};
pub use pacing::PacingPolicy;
pub use payload::{BroadcastPayload, DanmuStyle};
