//! Configuration validation.
//!
//! Runs before any transport resource is allocated. A failure aborts client
//! construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use super::types::{ClientConfig, HttpConfig, QueueConfig};

/// TLS store referenced by the queue configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialStore {
    Truststore,
    Keystore,
}

impl fmt::Display for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truststore => f.write_str("truststore"),
            Self::Keystore => f.write_str("keystore"),
        }
    }
}

/// Errors raised while validating or loading a client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A store path does not reference an existing file.
    #[error("{store} file not found at: {}", path.display())]
    MissingCredentialFile {
        store: CredentialStore,
        path: PathBuf,
    },
    /// A store password is empty.
    #[error("missing {store} password")]
    MissingCredential { store: CredentialStore },
    /// The index identifier is empty.
    #[error("missing index")]
    MissingIndex,
    /// The HTTP auth token is empty.
    #[error("missing token")]
    MissingToken,
    /// A store exists but could not be loaded with the supplied password.
    #[error("failed to load {store} at {}: {reason}", path.display())]
    InvalidCredential {
        store: CredentialStore,
        path: PathBuf,
        reason: String,
    },
    /// A tuning value is out of range or malformed.
    #[error("invalid client configuration: {0}")]
    InvalidSetting(String),
    /// A configuration file could not be read or parsed.
    #[error("failed to load configuration from {}: {reason}", path.display())]
    File { path: PathBuf, reason: String },
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(ConfigError::InvalidSetting(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok(())
        }
    }};
}

/// Validate whichever variant `config` holds.
pub fn validate(config: &ClientConfig) -> Result<(), ConfigError> {
    match config {
        ClientConfig::Queue(queue) => validate_queue(queue),
        ClientConfig::Http(http) => validate_http(http),
    }
}

/// Validate a broker configuration.
///
/// Checks run in a fixed order: truststore file, keystore file, keystore
/// password, truststore password, index, then tuning values.
pub fn validate_queue(config: &QueueConfig) -> Result<(), ConfigError> {
    ensure_file(CredentialStore::Truststore, config.truststore())?;
    ensure_file(CredentialStore::Keystore, config.keystore())?;
    ensure_password(CredentialStore::Keystore, &config.keystore_password)?;
    ensure_password(CredentialStore::Truststore, &config.truststore_password)?;
    ensure_index(&config.index)?;

    if config.brokers.is_empty() {
        return Err(ConfigError::InvalidSetting(
            "at least one broker address is required".into(),
        ));
    }
    if let Some(pos) = config.brokers.iter().position(|b| b.trim().is_empty()) {
        let reason = format!("broker address {pos} is blank");
        return Err(ConfigError::InvalidSetting(reason));
    }
    ensure_positive!(config.capacity, "capacity")?;
    ensure_positive!(config.report_capacity, "report_capacity")?;
    ensure_duration(config.ack_timeout, "ack_timeout")?;
    ensure_duration(config.flush_timeout, "flush_timeout")?;
    Ok(())
}

/// Validate an HTTP configuration.
pub fn validate_http(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.token.is_empty() {
        return Err(ConfigError::MissingToken);
    }
    ensure_index(&config.index)?;

    let base = config.api_base.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ConfigError::InvalidSetting(format!(
            "api_base must be an http(s) URL, got {:?}",
            config.api_base
        )));
    }
    ensure_duration(config.connect_timeout, "connect_timeout")?;
    ensure_duration(config.request_timeout, "request_timeout")?;
    Ok(())
}

fn ensure_file(store: CredentialStore, path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::MissingCredentialFile {
            store,
            path: path.to_path_buf(),
        })
    }
}

fn ensure_password(store: CredentialStore, password: &str) -> Result<(), ConfigError> {
    if password.is_empty() {
        Err(ConfigError::MissingCredential { store })
    } else {
        Ok(())
    }
}

fn ensure_index(index: &str) -> Result<(), ConfigError> {
    if index.is_empty() {
        Err(ConfigError::MissingIndex)
    } else {
        Ok(())
    }
}

fn ensure_duration(value: Duration, field: &str) -> Result<(), ConfigError> {
    if value.is_zero() {
        let reason = format!("{field} must be greater than zero");
        Err(ConfigError::InvalidSetting(reason))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::NamedTempFile;

    struct Stores {
        trust: NamedTempFile,
        key: NamedTempFile,
    }

    #[fixture]
    fn stores() -> Stores {
        Stores {
            trust: NamedTempFile::new().expect("truststore"),
            key: NamedTempFile::new().expect("keystore"),
        }
    }

    fn queue_config(stores: &Stores) -> QueueConfig {
        QueueConfig::new(
            "index",
            stores.trust.path(),
            "password",
            stores.key.path(),
            "password",
        )
    }

    #[rstest]
    fn accepts_complete_queue_config(stores: Stores) {
        validate_queue(&queue_config(&stores)).expect("valid config");
    }

    #[rstest]
    fn rejects_missing_truststore(stores: Stores) {
        let mut config = queue_config(&stores);
        config.truststore_path = "/definitely/not/here.jks".into();
        let err = validate_queue(&config).expect_err("missing truststore");
        assert!(matches!(
            err,
            ConfigError::MissingCredentialFile {
                store: CredentialStore::Truststore,
                ..
            }
        ));
        assert!(err.to_string().contains("/definitely/not/here.jks"));
    }

    #[rstest]
    fn rejects_directory_as_keystore(stores: Stores) {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = queue_config(&stores);
        config.keystore_path = dir.path().to_path_buf();
        assert!(matches!(
            validate_queue(&config),
            Err(ConfigError::MissingCredentialFile {
                store: CredentialStore::Keystore,
                ..
            })
        ));
    }

    #[rstest]
    #[case::keystore(CredentialStore::Keystore)]
    #[case::truststore(CredentialStore::Truststore)]
    fn rejects_empty_password(stores: Stores, #[case] store: CredentialStore) {
        let mut config = queue_config(&stores);
        match store {
            CredentialStore::Keystore => config.keystore_password.clear(),
            CredentialStore::Truststore => config.truststore_password.clear(),
        }
        let err = validate_queue(&config).expect_err("empty password");
        assert!(matches!(err, ConfigError::MissingCredential { store: s } if s == store));
    }

    #[rstest]
    fn keystore_password_is_checked_before_truststore_password(stores: Stores) {
        let mut config = queue_config(&stores);
        config.keystore_password.clear();
        config.truststore_password.clear();
        assert!(matches!(
            validate_queue(&config),
            Err(ConfigError::MissingCredential {
                store: CredentialStore::Keystore
            })
        ));
    }

    #[rstest]
    fn rejects_empty_queue_index(stores: Stores) {
        let mut config = queue_config(&stores);
        config.index.clear();
        assert!(matches!(
            validate_queue(&config),
            Err(ConfigError::MissingIndex)
        ));
    }

    #[rstest]
    fn rejects_empty_broker_list(stores: Stores) {
        let config = queue_config(&stores).with_brokers(Vec::<String>::new());
        assert!(matches!(
            validate_queue(&config),
            Err(ConfigError::InvalidSetting(_))
        ));
    }

    #[rstest]
    #[case::leading(vec!["", "b:9093"])]
    #[case::trailing(vec!["a:9093", "  "])]
    fn rejects_blank_broker_entry(stores: Stores, #[case] brokers: Vec<&str>) {
        let config = queue_config(&stores).with_brokers(brokers);
        let err = validate_queue(&config).expect_err("blank broker");
        assert!(err.to_string().contains("is blank"));
    }

    #[rstest]
    fn accepts_sub_millisecond_timeouts(stores: Stores) {
        let config = queue_config(&stores)
            .with_ack_timeout(Duration::from_micros(500))
            .with_flush_timeout(Duration::from_nanos(1));
        validate_queue(&config).expect("non-zero timeouts are valid");
    }

    #[rstest]
    fn rejects_zero_capacity(stores: Stores) {
        let err = validate_queue(&queue_config(&stores).with_capacity(0)).expect_err("capacity");
        assert_eq!(
            err.to_string(),
            "invalid client configuration: capacity must be greater than zero"
        );
    }

    #[rstest]
    #[case::empty_token("", "index", "missing token")]
    #[case::empty_index("token", "", "missing index")]
    #[case::token_checked_first("", "", "missing token")]
    fn rejects_incomplete_http_config(
        #[case] token: &str,
        #[case] index: &str,
        #[case] message: &str,
    ) {
        let err = validate_http(&HttpConfig::new(index, token)).expect_err("invalid");
        assert_eq!(err.to_string(), message);
    }

    #[rstest]
    fn rejects_non_http_api_base() {
        let config = HttpConfig::new("index", "token").with_api_base("ftp://example.com");
        assert!(matches!(
            validate_http(&config),
            Err(ConfigError::InvalidSetting(_))
        ));
    }

    #[rstest]
    fn rejects_zero_request_timeout() {
        let config = HttpConfig::new("index", "token").with_request_timeout(Duration::ZERO);
        assert!(matches!(
            validate(&config.into()),
            Err(ConfigError::InvalidSetting(_))
        ));
    }
}
