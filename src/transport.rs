//! Transport capability shared by the queue and HTTP backends.
//!
//! The client enriches events and hands the resulting batch to a
//! [`Transport`]. Each implementation decides how the batch maps onto the
//! wire: the broker transport sends one message per event, the HTTP transport
//! sends one request per batch.

use std::fmt;

use crossbeam_channel::Receiver;
use thiserror::Error;

use crate::queue_transport::DeliveryReport;

/// Client type written into events shipped through the broker.
pub const QUEUE_CLIENT_TYPE: &str = "rust-client-kafka";
/// Client type written into events shipped over HTTP.
pub const HTTP_CLIENT_TYPE: &str = "rust-client-http";

/// Which backend a client publishes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Queue,
    Http,
}

impl TransportKind {
    /// Value stamped into `cloudlog_client_type`.
    pub fn client_type(self) -> &'static str {
        match self {
            Self::Queue => QUEUE_CLIENT_TYPE,
            Self::Http => HTTP_CLIENT_TYPE,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue => f.write_str("queue"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Classification of an HTTP response status.
///
/// The sender only surfaces non-2xx statuses, so [`TransportError::HttpStatus`]
/// carries `Retryable` or `Permanent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx responses.
    Success,
    /// 429 and 5xx responses; the same batch may succeed later.
    Retryable,
    /// Any other status; resending the batch will not help.
    Permanent,
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> ResponseClass {
    match status {
        200..=299 => ResponseClass::Success,
        429 => ResponseClass::Retryable,
        500..=599 => ResponseClass::Retryable,
        _ => ResponseClass::Permanent,
    }
}

/// Errors reported by a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(String),
    /// The ingestion endpoint answered with a non-success status.
    #[error("HTTP endpoint returned status {status}")]
    HttpStatus { status: u16, class: ResponseClass },
    /// The broker rejected or never acknowledged a message.
    #[error("broker publish failed: {0}")]
    Broker(String),
    /// The internal publish queue stayed full for the enqueue timeout.
    #[error("publish queue is full")]
    QueueFull,
    /// The transport has been closed.
    #[error("transport is closed")]
    Closed,
}

impl TransportError {
    /// Whether resending the same events may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpStatus { class, .. } => *class == ResponseClass::Retryable,
            Self::Http(_) | Self::Broker(_) | Self::QueueFull => true,
            Self::Closed => false,
        }
    }
}

/// Delivery capability used by [`Client`](crate::Client).
///
/// Implementations are shared between threads; `publish` takes `&self` and
/// `close` takes `&mut self` so the client can hold an exclusive lock while
/// releasing the resource.
pub trait Transport: Send + Sync {
    /// Backend implemented by this transport.
    fn kind(&self) -> TransportKind;

    /// Deliver a batch of already enriched events.
    fn publish(&self, events: Vec<String>) -> Result<(), TransportError>;

    /// Wait for previously published events to be attempted.
    fn flush(&self) -> bool {
        true
    }

    /// Release the underlying resource. Calling it again is a no-op.
    fn close(&mut self);

    /// Per-event delivery outcomes, for transports that deliver asynchronously.
    fn delivery_reports(&self) -> Option<Receiver<DeliveryReport>> {
        None
    }
}
