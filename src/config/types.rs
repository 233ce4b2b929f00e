//! Configuration values for the two transports.
//!
//! Exactly one variant of [`ClientConfig`] is handed to
//! [`Client::new`](crate::Client::new); it fixes the transport for the
//! lifetime of the client.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default broker addresses for the queue transport.
pub const DEFAULT_BROKERS: &[&str] = &["kafka0401.bdp.anexia-it.com:8443"];
/// Default API base for the HTTP transport.
pub const DEFAULT_API_BASE: &str = "https://api0401.bdp.anexia-it.com";
/// Default number of retries for a failed broker send.
pub const DEFAULT_RETRIES: u32 = 10;
/// Default time the broker is given to acknowledge a message.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(30);
/// Default bounded capacity of the internal publish queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
/// Default bounded capacity of the delivery-report channel.
pub const DEFAULT_REPORT_CAPACITY: usize = 1024;
/// Default time `publish` waits for space in a saturated queue.
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on flush and shutdown waits.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout for HTTP requests.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default overall timeout for HTTP requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default base delay between broker retries.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);
/// Default maximum delay between broker retries.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Transport-specific client configuration.
#[derive(Clone, Debug)]
pub enum ClientConfig {
    /// Publish through a message broker with mutual TLS.
    Queue(QueueConfig),
    /// Publish through the HTTP ingestion API.
    Http(HttpConfig),
}

impl ClientConfig {
    /// Index identifier shared by both variants.
    pub fn index(&self) -> &str {
        match self {
            Self::Queue(config) => &config.index,
            Self::Http(config) => &config.index,
        }
    }
}

impl From<QueueConfig> for ClientConfig {
    fn from(config: QueueConfig) -> Self {
        Self::Queue(config)
    }
}

impl From<HttpConfig> for ClientConfig {
    fn from(config: HttpConfig) -> Self {
        Self::Http(config)
    }
}

/// Exponential backoff applied between broker retries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryBackoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            base: DEFAULT_BACKOFF_BASE,
            cap: DEFAULT_BACKOFF_CAP,
        }
    }
}

/// Configuration for the broker transport.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Index identifier, used as the broker topic.
    pub index: String,
    /// CA material used to verify the brokers.
    pub truststore_path: PathBuf,
    pub truststore_password: String,
    /// PKCS#12 client identity presented to the brokers.
    pub keystore_path: PathBuf,
    pub keystore_password: String,
    /// Bootstrap broker addresses (`host:port`).
    pub brokers: Vec<String>,
    /// Retries after a failed send before the event is dropped.
    pub retries: u32,
    /// Time the broker is given to acknowledge a message.
    pub ack_timeout: Duration,
    /// Bounded capacity of the internal publish queue.
    pub capacity: usize,
    /// Time `publish` waits for space in a saturated queue.
    pub enqueue_timeout: Duration,
    /// Bound on flush and shutdown waits.
    pub flush_timeout: Duration,
    /// Bounded capacity of the delivery-report channel.
    pub report_capacity: usize,
    pub backoff: RetryBackoff,
}

impl QueueConfig {
    /// Create a configuration with default brokers and tuning.
    pub fn new(
        index: impl Into<String>,
        truststore_path: impl Into<PathBuf>,
        truststore_password: impl Into<String>,
        keystore_path: impl Into<PathBuf>,
        keystore_password: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            truststore_path: truststore_path.into(),
            truststore_password: truststore_password.into(),
            keystore_path: keystore_path.into(),
            keystore_password: keystore_password.into(),
            brokers: DEFAULT_BROKERS.iter().map(|b| (*b).to_owned()).collect(),
            retries: DEFAULT_RETRIES,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            capacity: DEFAULT_CHANNEL_CAPACITY,
            enqueue_timeout: DEFAULT_ENQUEUE_TIMEOUT,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            report_capacity: DEFAULT_REPORT_CAPACITY,
            backoff: RetryBackoff::default(),
        }
    }

    /// Replace the bootstrap broker list.
    pub fn with_brokers<I, S>(mut self, brokers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.brokers = brokers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the retry count for failed sends.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the broker acknowledgement timeout.
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Set the internal publish queue capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set how long `publish` waits for queue space.
    pub fn with_enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Set the bound on flush and shutdown waits.
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// Set the delivery-report channel capacity.
    pub fn with_report_capacity(mut self, capacity: usize) -> Self {
        self.report_capacity = capacity;
        self
    }

    /// Override the retry backoff timings.
    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub(crate) fn truststore(&self) -> &Path {
        &self.truststore_path
    }

    pub(crate) fn keystore(&self) -> &Path {
        &self.keystore_path
    }
}

/// Configuration for the HTTP transport.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Index identifier, embedded in the ingestion URL.
    pub index: String,
    /// Value sent verbatim in the `Authorization` header.
    pub token: String,
    /// API base URL without a trailing path.
    pub api_base: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl HttpConfig {
    /// Create a configuration targeting the default API base.
    pub fn new(index: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_owned(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Target a different API base.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the overall request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
