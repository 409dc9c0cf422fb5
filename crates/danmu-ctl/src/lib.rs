//! danmu-ctl: paced delivery of danmu lines to a local overlay endpoint.

pub mod http;
pub mod sender;

pub use http::{DeliveryError, DeliveryResult, Endpoint, HttpEndpoint};
pub use sender::Sender;
