//! HTTP ingestion transport.
//!
//! [`HttpBatchSender`] posts every batch handed to it as a single request:
//!
//! ```text
//! POST <api_base>/v1/index/<index>/data
//! Content-Type: application/json
//! Authorization: <token>
//!
//! {"records":[<event>,<event>,...]}
//! ```
//!
//! The call blocks for one round trip. Failures are returned to the caller
//! and never retried at this layer; [`TransportError::is_retryable`] tells
//! the caller whether resending may help.
//!
//! [`TransportError::is_retryable`]: crate::transport::TransportError::is_retryable

mod envelope;
mod sender;
mod url;

#[cfg(test)]
mod tests;

pub use sender::HttpBatchSender;
