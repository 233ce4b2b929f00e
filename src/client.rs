//! Transport-agnostic event client.
//!
//! A [`Client`] is built from exactly one [`ClientConfig`] variant. The
//! configuration is validated before any transport resource exists, so a
//! client that constructs successfully is always ready to publish:
//!
//! ```text
//! Uninitialized ──validate──▶ Validated ──build transport──▶ Ready ──close──▶ Closed
//! ```
//!
//! Each publish call reads the clock once, enriches every event with that
//! timestamp and the client's fixed metadata, and hands the batch to the
//! transport.

use std::path::PathBuf;

use crossbeam_channel::Receiver;
use log::debug;
use parking_lot::RwLock;
use thiserror::Error;

use crate::{
    config::{ClientConfig, ConfigError, HttpConfig, QueueConfig, validate, validate_queue},
    enrich::{EventMetadata, current_timestamp_millis},
    http_transport::HttpBatchSender,
    queue_transport::{BrokerProducer, DeliveryReport, KafkaProducer, QueuePublisher},
    transport::{Transport, TransportError, TransportKind},
};

/// Errors surfaced by [`Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configuration was rejected; no client was created.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The transport failed to initialise or to deliver a batch.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The client has been closed.
    #[error("client is closed")]
    Closed,
}

/// Lifecycle state observable on a constructed client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    Ready,
    Closed,
}

/// Ships enriched events through one transport for its whole lifetime.
///
/// `Client` is `Send + Sync`. Publishing takes a shared lock on the
/// transport; [`close`](Self::close) takes it exclusively.
pub struct Client {
    kind: TransportKind,
    index: String,
    metadata: EventMetadata,
    transport: RwLock<Option<Box<dyn Transport>>>,
}

impl Client {
    /// Validate `config` and build the transport it selects.
    pub fn new(config: impl Into<ClientConfig>) -> Result<Self, ClientError> {
        let config = config.into();
        validate(&config)?;
        match config {
            ClientConfig::Queue(queue) => {
                let producer = KafkaProducer::new(&queue)?;
                Ok(Self::queue_ready(&queue, Box::new(producer)))
            }
            ClientConfig::Http(http) => {
                let sender = HttpBatchSender::new(&http)?;
                debug!("cloudlog: HTTP client ready for {}", sender.url());
                Ok(Self::ready(
                    TransportKind::Http,
                    &http.index,
                    Box::new(sender),
                ))
            }
        }
    }

    /// Build a broker client.
    pub fn queue(config: QueueConfig) -> Result<Self, ClientError> {
        Self::new(config)
    }

    /// Build an HTTP client.
    pub fn http(config: HttpConfig) -> Result<Self, ClientError> {
        Self::new(config)
    }

    /// Build a broker client with default brokers and tuning.
    pub fn connect_queue(
        index: impl Into<String>,
        truststore_path: impl Into<PathBuf>,
        truststore_password: impl Into<String>,
        keystore_path: impl Into<PathBuf>,
        keystore_password: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Self::new(QueueConfig::new(
            index,
            truststore_path,
            truststore_password,
            keystore_path,
            keystore_password,
        ))
    }

    /// Build an HTTP client against the default API base.
    pub fn connect_http(
        index: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Self::new(HttpConfig::new(index, token))
    }

    /// Build a broker client that publishes through `producer`.
    ///
    /// The configuration is validated exactly as for [`Client::queue`]; only
    /// the Kafka connection is replaced.
    pub fn queue_with_producer(
        config: QueueConfig,
        producer: impl BrokerProducer + 'static,
    ) -> Result<Self, ClientError> {
        validate_queue(&config)?;
        Ok(Self::queue_ready(&config, Box::new(producer)))
    }

    fn queue_ready(config: &QueueConfig, producer: Box<dyn BrokerProducer>) -> Self {
        let publisher = QueuePublisher::new(config, producer);
        debug!(
            "cloudlog: queue client ready for {} via {:?}",
            config.index, config.brokers
        );
        Self::ready(TransportKind::Queue, &config.index, Box::new(publisher))
    }

    fn ready(kind: TransportKind, index: &str, transport: Box<dyn Transport>) -> Self {
        Self {
            kind,
            index: index.to_owned(),
            metadata: EventMetadata::for_local_host(kind.client_type()),
            transport: RwLock::new(Some(transport)),
        }
    }

    /// Publish a single event.
    pub fn push_event(&self, event: &str) -> Result<(), ClientError> {
        self.push_events(&[event])
    }

    /// Publish a batch of events.
    ///
    /// Over HTTP the batch becomes one request and the call blocks until the
    /// response arrives. Through the broker each event becomes its own
    /// message; the call returns once all of them are queued and delivery
    /// failures are reported on [`delivery_reports`](Self::delivery_reports).
    pub fn push_events<S: AsRef<str>>(&self, events: &[S]) -> Result<(), ClientError> {
        let guard = self.transport.read();
        let Some(transport) = guard.as_ref() else {
            return Err(ClientError::Closed);
        };
        let timestamp = current_timestamp_millis();
        let batch = events
            .iter()
            .map(|event| self.metadata.enrich(event.as_ref(), timestamp))
            .collect();
        transport.publish(batch).map_err(ClientError::from)
    }

    /// Wait until everything published so far has been attempted.
    ///
    /// Returns `false` once the client is closed or if the wait times out.
    pub fn flush(&self) -> bool {
        self.transport
            .read()
            .as_ref()
            .is_some_and(|transport| transport.flush())
    }

    /// Release the transport. Later publishes fail with [`ClientError::Closed`].
    pub fn close(&self) {
        let mut guard = self.transport.write();
        if let Some(mut transport) = guard.take() {
            transport.close();
            debug!("cloudlog: {} client for {} closed", self.kind, self.index);
        }
    }

    /// Receiver of per-event broker outcomes; `None` for HTTP clients.
    pub fn delivery_reports(&self) -> Option<Receiver<DeliveryReport>> {
        self.transport
            .read()
            .as_ref()
            .and_then(|transport| transport.delivery_reports())
    }

    pub fn state(&self) -> ClientState {
        if self.transport.read().is_some() {
            ClientState::Ready
        } else {
            ClientState::Closed
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Client type and hostname stamped into every event.
    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("kind", &self.kind)
            .field("index", &self.index)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingProducer, TestCredentials};
    use rstest::rstest;
    use std::time::Duration;

    fn queue_client(creds: &TestCredentials, producer: RecordingProducer) -> Client {
        let config = QueueConfig::new(
            "index",
            creds.truststore(),
            "password",
            creds.keystore(),
            "password",
        )
        .with_flush_timeout(Duration::from_secs(5));
        Client::queue_with_producer(config, producer).expect("queue client")
    }

    #[rstest]
    fn missing_truststore_fails_construction() {
        let err = Client::connect_queue(
            "index",
            "/missing/truststore.p12",
            "password",
            "/missing/keystore.p12",
            "password",
        )
        .expect_err("construction must fail");
        assert!(matches!(
            err,
            ClientError::Config(ConfigError::MissingCredentialFile { .. })
        ));
    }

    #[rstest]
    fn empty_token_fails_construction() {
        let err = Client::connect_http("index", "").expect_err("construction must fail");
        assert!(matches!(
            err,
            ClientError::Config(ConfigError::MissingToken)
        ));
    }

    #[rstest]
    fn kafka_client_builds_without_network() {
        let creds = TestCredentials::generate("password");
        let client = Client::connect_queue(
            "index",
            creds.truststore(),
            "password",
            creds.keystore(),
            "password",
        )
        .expect("TLS material loads; brokers are contacted lazily");
        assert_eq!(client.kind(), TransportKind::Queue);
        assert_eq!(client.metadata().client_type, "rust-client-kafka");
    }

    #[rstest]
    fn close_is_idempotent_and_blocks_publishing() {
        let creds = TestCredentials::generate("password");
        let producer = RecordingProducer::new();
        let client = queue_client(&creds, producer.clone());
        assert_eq!(client.state(), ClientState::Ready);

        client.close();
        client.close();

        assert_eq!(client.state(), ClientState::Closed);
        assert!(producer.is_closed());
        assert!(matches!(
            client.push_event("late"),
            Err(ClientError::Closed)
        ));
        assert!(!client.flush());
        assert!(client.delivery_reports().is_none());
    }

    #[rstest]
    fn http_client_has_no_delivery_reports() {
        let client = Client::connect_http("index", "token").expect("http client");
        assert_eq!(client.kind(), TransportKind::Http);
        assert!(client.delivery_reports().is_none());
        assert!(client.flush());
    }
}
