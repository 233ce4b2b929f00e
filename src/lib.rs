//! Producer-side client for a centralised logging backend.
//!
//! Events are shipped through one of two interchangeable transports:
//!
//! - a message broker (Kafka over mutual TLS), asynchronous, one message per
//!   event, outcomes delivered on a channel;
//! - the HTTP ingestion API, synchronous, one request per batch.
//!
//! Whatever the transport, every event leaves the client as a JSON object
//! stamped with a timestamp, the client type and the source host (see
//! [`enrich()`]).
//!
//! ```no_run
//! use cloudlog_rs::{Client, HttpConfig};
//!
//! let client = Client::http(HttpConfig::new("my-index", "token"))?;
//! client.push_events(&["plain text", r#"{"level":"info","message":"json"}"#])?;
//! client.close();
//! # Ok::<(), cloudlog_rs::ClientError>(())
//! ```

pub mod client;
pub mod config;
pub mod enrich;
pub mod http_transport;
pub mod queue_transport;
mod rate_limited_warner;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use client::{Client, ClientError, ClientState};
pub use config::{
    ClientConfig, ConfigError, CredentialStore, HttpConfig, QueueConfig, RetryBackoff,
};
pub use enrich::{EventMetadata, enrich};
pub use http_transport::HttpBatchSender;
pub use queue_transport::{BrokerProducer, DeliveryReport, KafkaProducer, QueuePublisher};
pub use transport::{ResponseClass, Transport, TransportError, TransportKind};
