//! Synchronous batch sender.

use std::sync::Arc;

use log::{debug, warn};
use ureq::{Agent, AgentBuilder};

use crate::config::HttpConfig;
use crate::transport::{Transport, TransportError, TransportKind, classify_status};

use super::envelope::records_envelope;
use super::url::ingestion_url;

/// Posts enriched event batches to the ingestion endpoint.
///
/// The target URL and headers are fixed at construction. Each call to
/// [`publish`](Transport::publish) issues one POST and blocks until the
/// response arrives.
pub struct HttpBatchSender {
    agent: Agent,
    url: String,
    token: String,
}

impl HttpBatchSender {
    /// Build the sender and its connection pool from a validated configuration.
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let tls = native_tls::TlsConnector::new()
            .map_err(|err| TransportError::Http(format!("TLS initialisation failed: {err}")))?;
        let agent = AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout(config.request_timeout)
            .tls_connector(Arc::new(tls))
            .build();
        Ok(Self {
            agent,
            url: ingestion_url(&config.api_base, &config.index),
            token: config.token.clone(),
        })
    }

    /// Target URL of every request.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, body: &str) -> Result<(), TransportError> {
        let result = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .set("Authorization", &self.token)
            .send_string(body);
        match result {
            Ok(response) => {
                debug!("cloudlog: {} answered {}", self.url, response.status());
                // Drain the body so the connection returns to the pool.
                let _ = response.into_string();
                Ok(())
            }
            Err(ureq::Error::Status(status, _)) => {
                let class = classify_status(status);
                warn!("cloudlog: {} rejected batch with status {status}", self.url);
                Err(TransportError::HttpStatus { status, class })
            }
            Err(ureq::Error::Transport(err)) => {
                warn!("cloudlog: request to {} failed: {err}", self.url);
                Err(TransportError::Http(err.to_string()))
            }
        }
    }
}

impl Transport for HttpBatchSender {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    fn publish(&self, events: Vec<String>) -> Result<(), TransportError> {
        if events.is_empty() {
            return Ok(());
        }
        self.post(&records_envelope(&events))
    }

    fn close(&mut self) {}
}

impl std::fmt::Debug for HttpBatchSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBatchSender")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}
