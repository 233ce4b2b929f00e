//! Kafka-backed [`BrokerProducer`].

use std::time::Duration;

use kafka::client::{Compression, SecurityConfig};
use kafka::producer::{Producer, Record, RequiredAcks};
use log::{debug, warn};
use openssl::ssl::SslConnector;

use crate::config::{ConfigError, QueueConfig};
use crate::transport::TransportError;

use super::producer::BrokerProducer;
use super::tls::client_connector;

/// Client id announced to the brokers.
const CLIENT_ID: &str = "cloudlog-rs";

/// Publishes to Kafka over mutual TLS with `acks=all` and gzip compression.
///
/// TLS material is loaded when the producer is built. The broker connection
/// is opened on the first send and re-opened after a failed send.
pub struct KafkaProducer {
    brokers: Vec<String>,
    connector: SslConnector,
    ack_timeout: Duration,
    producer: Option<Producer>,
}

impl KafkaProducer {
    /// Load the TLS stores referenced by `config`.
    pub fn new(config: &QueueConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            brokers: config.brokers.clone(),
            connector: client_connector(config)?,
            ack_timeout: config.ack_timeout,
            producer: None,
        })
    }

    fn connect(&mut self) -> Result<&mut Producer, TransportError> {
        if self.producer.is_none() {
            debug!("cloudlog: connecting to brokers {:?}", self.brokers);
            let producer = Producer::from_hosts(self.brokers.clone())
                .with_client_id(CLIENT_ID.to_owned())
                .with_security(SecurityConfig::new(self.connector.clone()))
                .with_required_acks(RequiredAcks::All)
                .with_compression(Compression::GZIP)
                .with_ack_timeout(self.ack_timeout)
                .create()
                .map_err(|err| TransportError::Broker(format!("connection failed: {err}")))?;
            self.producer = Some(producer);
        }
        self.producer
            .as_mut()
            .ok_or_else(|| TransportError::Broker("no broker connection".into()))
    }
}

impl BrokerProducer for KafkaProducer {
    fn send(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let producer = self.connect()?;
        let record = Record::from_value(topic, payload.as_bytes());
        if let Err(err) = producer.send(&record) {
            warn!("cloudlog: broker rejected message for {topic}: {err}");
            // Reconnect on the next attempt in case the connection is broken.
            self.producer = None;
            return Err(TransportError::Broker(err.to_string()));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.producer = None;
    }
}

impl std::fmt::Debug for KafkaProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaProducer")
            .field("brokers", &self.brokers)
            .field("connected", &self.producer.is_some())
            .finish_non_exhaustive()
    }
}
