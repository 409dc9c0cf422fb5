//! `danmu-probe` argument handling and entry flow.

use std::future::Future;
use std::sync::Arc;

use danmu_core::ProbeConfig;

use crate::handler::EventHandler;
use crate::probe::Probe;
use crate::session::{RoomSession, SessionError};

pub const USAGE: &str = "Usage: danmu-probe <ROOM_ID>";

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("missing room id")]
    MissingRoomId,
    #[error("invalid room id: {0:?}")]
    InvalidRoomId(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CliError {
    /// Usage errors exit with 2, everything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Session(_) => 1,
        }
    }
}

/// Room id from the first positional argument (program name excluded).
pub fn parse_room_id<I, S>(args: I) -> Result<u64, UsageError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let first = args.into_iter().next().ok_or(UsageError::MissingRoomId)?;
    let raw = first.as_ref();
    raw.trim()
        .parse()
        .map_err(|_| UsageError::InvalidRoomId(raw.to_string()))
}

/// Parse arguments, build the session, and run one observation window.
/// `make_session` is only called once the room id is known to be valid.
pub async fn probe_main<A, S, F, I>(
    args: A,
    config: &ProbeConfig,
    handler: Arc<dyn EventHandler>,
    make_session: F,
    interrupt: I,
) -> Result<(), CliError>
where
    A: IntoIterator,
    A::Item: AsRef<str>,
    S: RoomSession,
    F: FnOnce(u64) -> S,
    I: Future<Output = ()>,
{
    let room_id = parse_room_id(args)?;
    let mut session = make_session(room_id);
    session.set_handler(handler)?;

    let probe = Probe::from_config(config);
    tracing::info!(room_id, window_secs = probe.window().as_secs(), "observing room");
    probe.run(&mut session, interrupt).await?;
    Ok(())
}
