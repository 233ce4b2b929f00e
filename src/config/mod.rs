//! Client configuration and validation.

mod file;
mod types;
mod validate;

pub use file::SECTION;
pub use types::{
    ClientConfig, DEFAULT_ACK_TIMEOUT, DEFAULT_API_BASE, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP,
    DEFAULT_BROKERS, DEFAULT_CHANNEL_CAPACITY, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENQUEUE_TIMEOUT,
    DEFAULT_FLUSH_TIMEOUT, DEFAULT_REPORT_CAPACITY, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRIES,
    HttpConfig, QueueConfig, RetryBackoff,
};
pub use validate::{ConfigError, CredentialStore, validate, validate_http, validate_queue};
