//! Room session lifecycle.
//!
//!   Created → Started → Stopping → Joined → Closed
//!
//! `stop_and_close` may be taken from any state except `Closed`, which is
//! terminal. Every other transition must follow the chain above.

use std::sync::Arc;

use crate::handler::EventHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Started,
    Stopping,
    Joined,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session transition {from:?} -> {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("handler can only be set before start (state {0:?})")]
    HandlerLocked(SessionState),

    #[error("no handler registered before start")]
    NoHandler,

    #[error("session task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

/// Transition guard shared by session implementations.
#[derive(Debug)]
pub struct Lifecycle {
    state: SessionState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: SessionState::Created,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `to` if the chain allows it; the state is unchanged on error.
    pub fn advance(&mut self, to: SessionState) -> Result<(), SessionError> {
        use SessionState::*;
        let allowed = matches!(
            (self.state, to),
            (Created, Started) | (Started, Stopping) | (Stopping, Joined)
        ) || (to == Closed && self.state != Closed);

        if !allowed {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::trace!(from = ?self.state, to = ?to, "session transition");
        self.state = to;
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection to one live room, driven through its lifecycle by the probe.
///
/// Implementations deliver events to the registered handler from a single
/// task between `start` and `join`.
#[allow(async_fn_in_trait)]
pub trait RoomSession {
    fn room_id(&self) -> u64;

    fn state(&self) -> SessionState;

    /// Attach the handler. Only allowed while `Created`.
    fn set_handler(&mut self, handler: Arc<dyn EventHandler>) -> Result<(), SessionError>;

    /// Begin delivering events. `Created → Started`.
    fn start(&mut self) -> Result<(), SessionError>;

    /// Ask the session to stop producing events. `Started → Stopping`.
    fn stop(&mut self) -> Result<(), SessionError>;

    /// Wait for in-flight handler calls to finish. `Stopping → Joined`.
    async fn join(&mut self) -> Result<(), SessionError>;

    /// Release every resource. Any state → `Closed`; must run exactly once.
    async fn stop_and_close(&mut self) -> Result<(), SessionError>;
}
