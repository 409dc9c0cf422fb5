//! Events pushed by a live room to the registered handler.

use serde_json::Value;

/// Periodic reply to our heartbeat, carrying the room's popularity figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatEvent {
    pub room_id: u64,
    pub popularity: u32,
}

/// One chat line (`DANMU_MSG`) posted in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessageEvent {
    pub room_id: u64,
    pub uid: u64,
    pub uname: String,
    pub msg: String,
    /// Unix milliseconds as reported by the server; 0 when absent.
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    Heartbeat(HeartbeatEvent),
    ChatMessage(ChatMessageEvent),
}

/// Command name with any `:suffix` stripped (`"DANMU_MSG:4:0:2:2:2:0"` → `"DANMU_MSG"`).
pub fn command_name(root: &Value) -> Option<&str> {
    let cmd = root.get("cmd")?.as_str()?;
    Some(cmd.split(':').next().unwrap_or(cmd))
}

impl ChatMessageEvent {
    /// Parse a `DANMU_MSG` command body.
    ///
    /// Layout: `info[0][4]` timestamp, `info[1]` text, `info[2][0]` uid,
    /// `info[2][1]` user name. Returns `None` when the text is missing.
    pub fn from_command(room_id: u64, root: &Value) -> Option<Self> {
        let msg = root.pointer("/info/1")?.as_str()?.to_string();
        let uid = root.pointer("/info/2/0").and_then(Value::as_u64).unwrap_or(0);
        let uname = root
            .pointer("/info/2/1")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let timestamp_ms = root.pointer("/info/0/4").and_then(Value::as_u64).unwrap_or(0);

        Some(Self {
            room_id,
            uid,
            uname,
            msg,
            timestamp_ms,
        })
    }
}
