//! Live room client.
//!
//! `start` spawns two tasks: the connection task, which owns the websocket
//! and turns frames into events, and the event dispatcher, which owns the
//! handler. They talk over the dispatcher's channel. `stop` flips the
//! shutdown signal; the connection task answers with a websocket close and
//! exits, dropping its event sender so the dispatcher can drain.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, ORIGIN, USER_AGENT};
use tokio_tungstenite::tungstenite::Message;

use danmu_core::ProbeConfig;

use crate::dispatch::{EventDispatcher, EventSender};
use crate::event::{command_name, ChatMessageEvent, HeartbeatEvent, LiveEvent};
use crate::handler::{EventHandler, RoomContext};
use crate::room::{ConnectPlan, RoomLookup};
use crate::session::{Lifecycle, RoomSession, SessionError, SessionState};
use crate::wire::{self, Operation, Packet};

const LIVE_ORIGIN: &str = "https://live.bilibili.com";

/// How long `stop_and_close` waits for the connection task before aborting it.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

pub struct BiliLiveClient {
    room_id: u64,
    config: ProbeConfig,
    lifecycle: Lifecycle,
    handler: Option<Arc<dyn EventHandler>>,
    shutdown: watch::Sender<bool>,
    connection: Option<JoinHandle<()>>,
    dispatcher: Option<EventDispatcher>,
}

impl BiliLiveClient {
    /// No network activity happens until `start`.
    pub fn new(room_id: u64, config: ProbeConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            room_id,
            config,
            lifecycle: Lifecycle::new(),
            handler: None,
            shutdown,
            connection: None,
            dispatcher: None,
        }
    }
}

impl RoomSession for BiliLiveClient {
    fn room_id(&self) -> u64 {
        self.room_id
    }

    fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    fn set_handler(&mut self, handler: Arc<dyn EventHandler>) -> Result<(), SessionError> {
        if self.lifecycle.state() != SessionState::Created {
            return Err(SessionError::HandlerLocked(self.lifecycle.state()));
        }
        self.handler = Some(handler);
        Ok(())
    }

    fn start(&mut self) -> Result<(), SessionError> {
        let handler = self.handler.clone().ok_or(SessionError::NoHandler)?;
        self.lifecycle.advance(SessionState::Started)?;

        let dispatcher = EventDispatcher::spawn(RoomContext { room_id: self.room_id }, handler);
        let events = dispatcher
            .sender()
            .ok_or_else(|| SessionError::Other("dispatcher closed before start".into()))?;
        self.dispatcher = Some(dispatcher);

        self.connection = Some(tokio::spawn(run_connection(
            self.room_id,
            self.config.clone(),
            events,
            self.shutdown.subscribe(),
        )));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        self.lifecycle.advance(SessionState::Stopping)?;
        self.shutdown.send_replace(true);
        Ok(())
    }

    async fn join(&mut self) -> Result<(), SessionError> {
        self.lifecycle.advance(SessionState::Joined)?;
        if let Some(connection) = self.connection.take() {
            connection.await?;
        }
        if let Some(dispatcher) = self.dispatcher.as_mut() {
            let handled = dispatcher.join().await?;
            tracing::debug!(room_id = self.room_id, handled, "session joined");
        }
        Ok(())
    }

    async fn stop_and_close(&mut self) -> Result<(), SessionError> {
        self.lifecycle.advance(SessionState::Closed)?;
        self.shutdown.send_replace(true);

        if let Some(mut connection) = self.connection.take() {
            match tokio::time::timeout(CLOSE_GRACE, &mut connection).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(room_id = self.room_id, error = %e, "connection task failed"),
                Err(_) => {
                    tracing::warn!(room_id = self.room_id, "connection task did not exit, aborting");
                    connection.abort();
                }
            }
        }
        if let Some(mut dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
        }
        Ok(())
    }
}

// ── Connection task ───────────────────────────────────────────────────────────

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn run_connection(
    room_id: u64,
    config: ProbeConfig,
    events: EventSender,
    mut shutdown: watch::Receiver<bool>,
) {
    let connected = tokio::select! {
        r = connect(room_id, &config) => r,
        _ = shutdown.wait_for(|stop| *stop) => return,
    };

    let result = match connected {
        Ok((ws, plan)) => serve(ws, &plan, &config, &events, &mut shutdown).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => tracing::debug!(room_id, "connection closed"),
        Err(e) => tracing::warn!(room_id, error = %e, "live connection failed"),
    }
}

/// Run the HTTP lookups, then open the websocket they point at.
async fn connect(room_id: u64, config: &ProbeConfig) -> anyhow::Result<(WsStream, ConnectPlan)> {
    let plan = RoomLookup::new(config)
        .prepare(room_id, &config.ws_url, config.debug)
        .await;

    let mut request = plan.ws_url.as_str().into_client_request()?;
    request
        .headers_mut()
        .insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
    request
        .headers_mut()
        .insert(ORIGIN, HeaderValue::from_static(LIVE_ORIGIN));

    let (ws, _) = tokio_tungstenite::connect_async(request).await?;
    tracing::debug!(room_id, real_room_id = plan.room_id, url = %plan.ws_url, "websocket connected");
    Ok((ws, plan))
}

fn auth_body(plan: &ConnectPlan) -> Vec<u8> {
    let mut body = serde_json::json!({
        "uid": 0,
        "roomid": plan.room_id,
        "protover": 3,
        "platform": "web",
        "type": 2,
        "buvid": plan.buvid.as_deref().unwrap_or_default(),
    });
    if let Some(token) = &plan.token {
        body["key"] = serde_json::Value::from(token.as_str());
    }
    body.to_string().into_bytes()
}

async fn serve(
    ws: WsStream,
    plan: &ConnectPlan,
    config: &ProbeConfig,
    events: &EventSender,
    shutdown: &mut watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let (mut sink, mut stream) = ws.split();

    let auth = wire::encode(Operation::Auth, &auth_body(plan));
    sink.send(Message::Binary(auth.into())).await?;

    let period = Duration::from_secs(config.heartbeat_interval_secs.max(1));
    let mut heartbeat = tokio::time::interval(period);

    if *shutdown.borrow() {
        return close(&mut sink).await;
    }

    loop {
        tokio::select! {
            _ = shutdown.changed() => return close(&mut sink).await,
            _ = heartbeat.tick() => {
                sink.send(Message::Binary(wire::encode(Operation::Heartbeat, &[]).into())).await?;
            }
            frame = stream.next() => match frame {
                None | Some(Ok(Message::Close(_))) => return Ok(()),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Binary(data))) => {
                    if handle_frame(&data, plan.room_id, config.debug, events).is_break() {
                        return close(&mut sink).await;
                    }
                }
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn close<S>(sink: &mut S) -> anyhow::Result<()>
where
    S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    match tokio::time::timeout(CLOSE_GRACE, sink.send(Message::Close(None))).await {
        Ok(sent) => Ok(sent?),
        Err(_) => anyhow::bail!("websocket close timed out"),
    }
}

/// Turn one binary frame into events. Breaks when the connection should end.
fn handle_frame(data: &[u8], room_id: u64, debug: bool, events: &EventSender) -> ControlFlow<()> {
    let packets = match wire::decode(data) {
        Ok(packets) => packets,
        Err(e) => {
            diag!(debug, room_id, error = %e, "dropping malformed frame");
            return ControlFlow::Continue(());
        }
    };

    for packet in packets {
        let event = match packet {
            Packet::HeartbeatReply { popularity } => {
                Some(LiveEvent::Heartbeat(HeartbeatEvent { room_id, popularity }))
            }
            Packet::Command(body) => match command_name(&body) {
                Some("DANMU_MSG") => {
                    let chat = ChatMessageEvent::from_command(room_id, &body);
                    if chat.is_none() {
                        diag!(debug, room_id, "DANMU_MSG without text");
                    }
                    chat.map(LiveEvent::ChatMessage)
                }
                _ => None,
            },
            Packet::AuthReply(body) => match body.get("code").and_then(|c| c.as_i64()) {
                Some(0) => {
                    tracing::debug!(room_id, "auth accepted");
                    None
                }
                code => {
                    diag!(debug, room_id, ?code, body = %body, "auth rejected");
                    return ControlFlow::Break(());
                }
            },
        };

        if let Some(event) = event {
            if events.send(event).is_err() {
                return ControlFlow::Break(());
            }
        }
    }
    ControlFlow::Continue(())
}
