//! Everything fetched over HTTP before the websocket opens: the real room id,
//! a visitor cookie, and the broadcast host plus auth token from the
//! WBI-signed server lookup.

use anyhow::{bail, Context, Result};
use md5::{Digest, Md5};
use reqwest::header::{SET_COOKIE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use danmu_core::ProbeConfig;

/// Character picks that turn the two WBI image keys into the mixin key.
const MIXIN_KEY_TABLE: [usize; 32] = [
    46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19,
    29, 28, 14, 39, 12, 38, 41, 13,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomInfo {
    /// Real room id; short ids resolve to this.
    pub room_id: u64,
    pub owner_uid: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DanmakuHost {
    pub host: String,
    pub wss_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanmuServerInfo {
    pub hosts: Vec<DanmakuHost>,
    pub token: Option<String>,
}

impl DanmuServerInfo {
    /// Websocket URL of the first advertised host.
    pub fn ws_url(&self) -> Option<String> {
        self.hosts
            .first()
            .map(|h| format!("wss://{}:{}/sub", h.host, h.wss_port))
    }
}

/// What the connection task needs to open and authenticate a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPlan {
    pub room_id: u64,
    pub ws_url: String,
    pub token: Option<String>,
    pub buvid: Option<String>,
}

// ── Response shapes ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RoomInfoResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<RoomInfoData>,
}

#[derive(Deserialize)]
struct RoomInfoData {
    room_id: u64,
    #[serde(default)]
    uid: u64,
}

/// The nav endpoint answers `code = -101` for visitors but still carries the keys.
#[derive(Deserialize)]
struct NavResponse {
    data: Option<NavData>,
}

#[derive(Deserialize)]
struct NavData {
    wbi_img: WbiImg,
}

#[derive(Deserialize)]
struct WbiImg {
    img_url: String,
    sub_url: String,
}

#[derive(Deserialize)]
struct DanmuInfoResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<DanmuInfoData>,
}

#[derive(Deserialize)]
struct DanmuInfoData {
    #[serde(default)]
    host_list: Vec<DanmakuHost>,
    token: Option<String>,
}

// ── Lookup ────────────────────────────────────────────────────────────────────

pub struct RoomLookup {
    client: reqwest::Client,
    room_info_url: String,
    buvid_url: String,
    wbi_url: String,
    danmu_info_url: String,
    user_agent: String,
}

impl RoomLookup {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            room_info_url: config.room_info_url.clone(),
            buvid_url: config.buvid_url.clone(),
            wbi_url: config.wbi_url.clone(),
            danmu_info_url: config.danmu_info_url.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("GET {url}: response is not JSON"))
    }

    /// Resolve a (possibly short) room id through the room info API.
    pub async fn resolve(&self, room_id: u64) -> Result<RoomInfo> {
        let url = format!("{}?room_id={}", self.room_info_url, room_id);
        parse_room_info(self.get_json(&url).await?)
    }

    /// Visitor `buvid3` cookie from the home page. `None` on any failure.
    pub async fn buvid(&self) -> Option<String> {
        let resp = self
            .client
            .get(&self.buvid_url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "buvid request failed"))
            .ok()?;

        resp.headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| cookie_value(cookie, "buvid3"))
    }

    /// Mixin key for signing, derived from the nav endpoint's image URLs.
    pub async fn wbi_key(&self) -> Result<String> {
        let resp: NavResponse = self.get_json(&self.wbi_url).await?;
        let img = resp.data.context("nav response has no data")?.wbi_img;
        Ok(mixin_key(&img.img_url, &img.sub_url))
    }

    /// Broadcast hosts and auth token for a real room id.
    pub async fn danmu_server(&self, room_id: u64, wbi_key: &str) -> Result<DanmuServerInfo> {
        let wts = danmu_core::payload::unix_now_secs() as u64;
        let query = signed_query(&[("id", room_id.to_string()), ("type", "0".into())], wbi_key, wts);
        let url = format!("{}?{}", self.danmu_info_url, query);
        parse_danmu_info(self.get_json(&url).await?)
    }

    /// Run every lookup. Failures fall back to the given room id and `fallback_ws_url`.
    pub async fn prepare(&self, room_id: u64, fallback_ws_url: &str, debug: bool) -> ConnectPlan {
        let real_room_id = match self.resolve(room_id).await {
            Ok(info) => {
                tracing::debug!(room_id, real_room_id = info.room_id, owner_uid = info.owner_uid, "room resolved");
                info.room_id
            }
            Err(e) => {
                diag!(debug, room_id, error = %e, "room lookup failed, using id as given");
                room_id
            }
        };
        let buvid = self.buvid().await;

        let server = match self.wbi_key().await {
            Ok(key) => self.danmu_server(real_room_id, &key).await,
            Err(e) => Err(e),
        };
        let (ws_url, token) = match server {
            Ok(info) => {
                tracing::debug!(
                    room_id,
                    hosts = info.hosts.len(),
                    has_token = info.token.is_some(),
                    "danmu server info"
                );
                let url = info.ws_url().unwrap_or_else(|| fallback_ws_url.to_string());
                (url, info.token)
            }
            Err(e) => {
                diag!(debug, room_id, error = %e, fallback = fallback_ws_url, "danmu server lookup failed");
                (fallback_ws_url.to_string(), None)
            }
        };

        ConnectPlan {
            room_id: real_room_id,
            ws_url,
            token,
            buvid,
        }
    }
}

fn parse_room_info(resp: RoomInfoResponse) -> Result<RoomInfo> {
    if resp.code != 0 {
        bail!("room info rejected: code={} message={}", resp.code, resp.message);
    }
    let data = resp.data.context("room info response has no data")?;
    Ok(RoomInfo {
        room_id: data.room_id,
        owner_uid: data.uid,
    })
}

fn parse_danmu_info(resp: DanmuInfoResponse) -> Result<DanmuServerInfo> {
    if resp.code != 0 {
        bail!("danmu info rejected: code={} message={}", resp.code, resp.message);
    }
    let data = resp.data.context("danmu info response has no data")?;
    Ok(DanmuServerInfo {
        hosts: data.host_list,
        token: data.token.filter(|t| !t.is_empty()),
    })
}

/// File stem of a key image URL: `.../7cd08494...c.png` → `7cd08494...c`.
fn key_from_url(url: &str) -> &str {
    let file = url.rsplit('/').next().unwrap_or(url);
    file.split('.').next().unwrap_or(file)
}

fn mixin_key(img_url: &str, sub_url: &str) -> String {
    let raw = format!("{}{}", key_from_url(img_url), key_from_url(sub_url));
    let raw = raw.as_bytes();
    MIXIN_KEY_TABLE
        .iter()
        .filter_map(|&i| raw.get(i).map(|&b| b as char))
        .collect()
}

/// Query string with `wts` and the `w_rid` signature appended.
fn signed_query(params: &[(&str, String)], mixin_key: &str, wts: u64) -> String {
    let mut pairs: Vec<(&str, String)> = params
        .iter()
        .map(|(k, v)| (*k, v.chars().filter(|c| !"!'()*".contains(*c)).collect()))
        .collect();
    pairs.push(("wts", wts.to_string()));
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let unsigned = encode_query(&pairs);
    let w_rid = hex::encode(Md5::digest(format!("{unsigned}{mixin_key}").as_bytes()));
    pairs.push(("w_rid", w_rid));
    encode_query(&pairs)
}

fn encode_query(pairs: &[(&str, String)]) -> String {
    let mut ser = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        ser.append_pair(k, v);
    }
    ser.finish()
}

/// Value of `name` from one `Set-Cookie` header.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    let pair = header.split(';').next()?;
    let (key, value) = pair.split_once('=')?;
    (key.trim() == name && !value.is_empty()).then(|| value.trim().to_string())
}
