//! Paced sequential sender.
//!
//! Lines go out strictly one at a time: the next send starts only after the
//! previous result has been reported and its pacing delay has elapsed. The
//! first delivery error ends the run.

use danmu_core::{BroadcastPayload, DanmuStyle, PacingPolicy, SenderConfig};

use crate::http::{DeliveryError, DeliveryResult, Endpoint};

pub struct Sender<E> {
    endpoint: E,
    style: DanmuStyle,
    pacing: PacingPolicy,
}

impl<E: Endpoint> Sender<E> {
    pub fn new(endpoint: E, style: DanmuStyle, pacing: PacingPolicy) -> Self {
        Self {
            endpoint,
            style,
            pacing,
        }
    }

    pub fn from_config(endpoint: E, config: &SenderConfig) -> Self {
        Self::new(endpoint, config.style.clone(), PacingPolicy::from_config(config))
    }

    /// Build a payload stamped "now" and deliver it. Exactly one call to the endpoint.
    pub async fn send_one(&self, message: &str) -> Result<DeliveryResult, DeliveryError> {
        let payload = BroadcastPayload::new(message, &self.style);
        tracing::debug!(text = message, time = payload.time, "sending danmu");
        self.endpoint.deliver(&payload).await
    }

    /// Send every message in order, pausing after each. Returns how many were delivered.
    pub async fn run<S: AsRef<str>>(&self, messages: &[S]) -> Result<usize, DeliveryError> {
        for (index, message) in messages.iter().enumerate() {
            let message = message.as_ref();

            let result = self.send_one(message).await.inspect_err(|e| {
                tracing::error!(index, error = %e, "delivery failed, aborting run");
            })?;
            println!("Status Code: {}, Response: {}", result.status, result.body);

            let delay = self.pacing.delay_for(message);
            tracing::info!(
                index,
                status = result.status,
                delay_ms = delay.as_millis() as u64,
                "danmu delivered"
            );
            tokio::time::sleep(delay).await;
        }

        Ok(messages.len())
    }
}
