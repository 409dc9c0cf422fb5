//! Event handler trait for live-room sessions.
//!
//! A session owns exactly one handler and calls it from a single task, so
//! implementations never see two calls at once.

use crate::event::{ChatMessageEvent, HeartbeatEvent};

/// The room id the session was opened with. Events carry the resolved real id,
/// which differs when a short id was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomContext {
    pub room_id: u64,
}

/// The two notifications a live session delivers. Nothing is returned to the session.
pub trait EventHandler: Send + Sync {
    fn on_heartbeat(&self, room: &RoomContext, event: &HeartbeatEvent);

    fn on_chat_message(&self, room: &RoomContext, event: &ChatMessageEvent);
}

/// Prints every event to stdout, prefixed with the real room id.
pub struct PrintHandler;

impl PrintHandler {
    fn heartbeat_line(event: &HeartbeatEvent) -> String {
        format!("[{}] heartbeat popularity={}", event.room_id, event.popularity)
    }

    fn chat_line(event: &ChatMessageEvent) -> String {
        format!("[{}] {}: {}", event.room_id, event.uname, event.msg)
    }
}

impl EventHandler for PrintHandler {
    fn on_heartbeat(&self, _room: &RoomContext, event: &HeartbeatEvent) {
        println!("{}", Self::heartbeat_line(event));
    }

    fn on_chat_message(&self, _room: &RoomContext, event: &ChatMessageEvent) {
        println!("{}", Self::chat_line(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_use_the_event_room_id() {
        let heartbeat = HeartbeatEvent {
            room_id: 54321,
            popularity: 7,
        };
        assert_eq!(PrintHandler::heartbeat_line(&heartbeat), "[54321] heartbeat popularity=7");

        let chat = ChatMessageEvent {
            room_id: 54321,
            uid: 1,
            uname: "viewer".into(),
            msg: "hi".into(),
            timestamp_ms: 0,
        };
        assert_eq!(PrintHandler::chat_line(&chat), "[54321] viewer: hi");
    }
}
