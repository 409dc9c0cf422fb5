//! danmu-live: a live-room chat client and the probe that observes one room.

/// Warn when the debug flag is set, otherwise log at debug level.
macro_rules! diag {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            tracing::warn!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub mod cli;
pub mod client;
pub mod dispatch;
pub mod event;
pub mod handler;
pub mod probe;
pub mod room;
pub mod session;
pub mod wire;

pub use client::BiliLiveClient;
pub use event::{ChatMessageEvent, HeartbeatEvent, LiveEvent};
pub use handler::{EventHandler, PrintHandler, RoomContext};
pub use probe::Probe;
pub use session::{RoomSession, SessionError, SessionState};
