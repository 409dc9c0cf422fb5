//! Configuration for the danmu tools.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $DANMU_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/danmu/config.toml
//!   3. ~/.config/danmu/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::payload::DanmuStyle;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DanmuConfig {
    pub sender: SenderConfig,
    pub probe: ProbeConfig,
}

/// Settings for the paced broadcast sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Full URL of the overlay's send endpoint.
    pub endpoint: String,
    /// Seconds added to the pause per character of the message just sent.
    pub per_char_delay_secs: f64,
    /// Seconds always paused after a message.
    pub base_delay_secs: f64,
    /// Presentation attributes attached to every payload.
    pub style: DanmuStyle,
    /// Lines sent, in order, once each.
    pub messages: Vec<String>,
}

/// Settings for the live-room session probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// How long the session stays open before teardown.
    pub observation_secs: u64,
    /// Interval between client heartbeat packets.
    pub heartbeat_interval_secs: u64,
    /// Broadcast server used when the server lookup yields no host.
    pub ws_url: String,
    /// Room lookup endpoint; short ids resolve to the real room id here.
    pub room_info_url: String,
    /// Page fetched once for the `buvid3` cookie.
    pub buvid_url: String,
    /// Source of the WBI signing keys.
    pub wbi_url: String,
    /// Signed lookup returning broadcast hosts and the auth token.
    pub danmu_info_url: String,
    pub user_agent: String,
    /// Surface the live client's internal warnings.
    pub debug: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8180/api/send-danmu";

/// The script sent when no `[sender] messages` are configured.
pub const DEFAULT_SCRIPT: [&str; 15] = [
    "痛苦啊，你就是我的唯一。",
    "除了你，我皆无欲求。",
    "痛苦啊，你忠实地陪伴着我，直至现在也没有一丝改变。",
    "当我的灵魂徘徊于深渊之底时。",
    "唯有你相伴在我的身旁，守护着我。",
    "我又怎能埋怨你呢。",
    "痛苦啊，你绝不会从我的身旁遁走。",
    "我终于能够表达对你的尊敬。",
    "现在也认识到了你的存在。",
    "而你只是存在于世，就已那么美丽。",
    "痛苦啊，你就像那从未离开我那贫苦的心之火炉旁的人一样。",
    "比我那身为至爱的恋人还要多情。",
    "我知道在我迈向死亡的那一天。",
    "你会进到我的内心深处。",
    "与我并排躺下。",
];

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            per_char_delay_secs: 0.1,
            base_delay_secs: 3.0,
            style: DanmuStyle::default(),
            messages: DEFAULT_SCRIPT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            observation_secs: 20,
            heartbeat_interval_secs: 30,
            ws_url: "wss://broadcastlv.chat.bilibili.com/sub".to_string(),
            room_info_url: "https://api.live.bilibili.com/room/v1/Room/get_info".to_string(),
            buvid_url: "https://www.bilibili.com/".to_string(),
            wbi_url: "https://api.bilibili.com/x/web-interface/nav".to_string(),
            danmu_info_url: "https://api.live.bilibili.com/xlive/web-room/v1/index/getDanmuInfo"
                .to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/102.0.0.0 Safari/537.36"
                .to_string(),
            debug: false,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("danmu")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn env_flag(v: &str) -> bool {
    matches!(v, "1" | "true" | "TRUE" | "yes" | "YES")
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl DanmuConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            DanmuConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("DANMU_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply DANMU_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DANMU_SENDER__ENDPOINT") {
            self.sender.endpoint = v;
        }
        if let Ok(v) = std::env::var("DANMU_PROBE__OBSERVATION_SECS") {
            if let Ok(secs) = v.parse() {
                self.probe.observation_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("DANMU_PROBE__WS_URL") {
            self.probe.ws_url = v;
        }
        if let Ok(v) = std::env::var("DANMU_PROBE__DEBUG") {
            self.probe.debug = env_flag(&v);
        }
        // Short alias read by the live client.
        if let Ok(v) = std::env::var("DANMU_LIVE_DEBUG") {
            self.probe.debug = env_flag(&v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_behaviour() {
        let config = DanmuConfig::default();
        assert_eq!(config.sender.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.sender.per_char_delay_secs, 0.1);
        assert_eq!(config.sender.base_delay_secs, 3.0);
        assert_eq!(config.sender.messages.len(), 15);
        assert_eq!(config.sender.messages[14], "与我并排躺下。");
        assert_eq!(config.probe.observation_secs, 20);
        assert!(config.probe.ws_url.starts_with("wss://"));
        assert!(!config.probe.debug);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let text = r#"
            [sender]
            endpoint = "http://127.0.0.1:9999/api/send-danmu"
            messages = ["a", "b"]

            [probe]
            observation_secs = 5
        "#;
        let config: DanmuConfig = toml::from_str(text).unwrap();
        assert_eq!(config.sender.endpoint, "http://127.0.0.1:9999/api/send-danmu");
        assert_eq!(config.sender.messages, vec!["a", "b"]);
        assert_eq!(config.sender.base_delay_secs, 3.0);
        assert_eq!(config.sender.style.size, 32);
        assert_eq!(config.probe.observation_secs, 5);
        assert_eq!(config.probe.heartbeat_interval_secs, 30);
    }

    #[test]
    fn load_from_missing_path_gives_defaults() {
        let path = std::env::temp_dir()
            .join(format!("danmu-config-missing-{}", std::process::id()))
            .join("config.toml");
        let config = DanmuConfig::load_from(&path).expect("missing file is not an error");
        assert_eq!(config.sender.messages.len(), DEFAULT_SCRIPT.len());
    }

    #[test]
    fn load_from_rejects_malformed_toml() {
        let tmp = std::env::temp_dir().join(format!("danmu-config-bad-{}", std::process::id()));
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("config.toml");
        std::fs::write(&path, "[sender\nendpoint = 1").unwrap();

        let err = DanmuConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(..)));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn env_flag_accepts_common_spellings() {
        assert!(env_flag("1"));
        assert!(env_flag("true"));
        assert!(env_flag("YES"));
        assert!(!env_flag("0"));
        assert!(!env_flag(""));
    }
}
