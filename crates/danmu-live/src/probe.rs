//! Observation probe: drives one room session through its lifecycle.
//!
//! start → wait for the window (or an interrupt) → stop → join, then
//! `stop_and_close` on every exit path. The first error from the guarded
//! section is returned after cleanup; a close error is returned only when
//! nothing failed before it.

use std::future::Future;
use std::time::Duration;

use danmu_core::ProbeConfig;

use crate::session::{RoomSession, SessionError};

pub struct Probe {
    window: Duration,
}

impl Probe {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(Duration::from_secs(config.observation_secs))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run the session for the observation window. `interrupt` ends the window early.
    pub async fn run<S, I>(&self, session: &mut S, interrupt: I) -> Result<(), SessionError>
    where
        S: RoomSession,
        I: Future<Output = ()>,
    {
        let room_id = session.room_id();
        let outcome = self.observe(session, interrupt).await;
        let closed = session.stop_and_close().await;

        match (outcome, closed) {
            (Ok(()), Ok(())) => {
                tracing::info!(room_id, "session closed");
                Ok(())
            }
            (Err(e), Ok(())) => {
                tracing::warn!(room_id, error = %e, "session closed after teardown error");
                Err(e)
            }
            (Ok(()), Err(close_err)) => Err(close_err),
            (Err(e), Err(close_err)) => {
                tracing::error!(room_id, error = %close_err, "close failed after teardown error");
                Err(e)
            }
        }
    }

    async fn observe<S, I>(&self, session: &mut S, interrupt: I) -> Result<(), SessionError>
    where
        S: RoomSession,
        I: Future<Output = ()>,
    {
        session.start()?;
        tracing::info!(
            room_id = session.room_id(),
            window_secs = self.window().as_secs_f64(),
            "session started"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.window) => {}
            _ = interrupt => tracing::info!("observation interrupted"),
        }

        session.stop()?;
        session.join().await
    }
}
