//! HTTP delivery of broadcast payloads.

use danmu_core::BroadcastPayload;

/// Status code and body text of one delivery, passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to reach {url}, is the overlay running? ({source})")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Something that accepts one payload and answers with a status and body.
#[allow(async_fn_in_trait)]
pub trait Endpoint {
    async fn deliver(&self, payload: &BroadcastPayload<'_>) -> Result<DeliveryResult, DeliveryError>;
}

/// Posts payloads as JSON to a fixed URL.
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Endpoint for HttpEndpoint {
    async fn deliver(&self, payload: &BroadcastPayload<'_>) -> Result<DeliveryResult, DeliveryError> {
        let resp = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                url: self.url.clone(),
                source: Box::new(e),
            })?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| DeliveryError::Body {
            url: self.url.clone(),
            source: Box::new(e),
        })?;

        Ok(DeliveryResult { status, body })
    }
}
