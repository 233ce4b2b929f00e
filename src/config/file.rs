//! INI configuration files.
//!
//! A client configuration may be kept in a `[cloudlog]` section:
//!
//! ```ini
//! [cloudlog]
//! transport = http
//! index = my-index
//! token = secret
//! request_timeout_ms = 10000
//! ```
//!
//! `transport = queue` selects the broker variant, which reads `truststore`,
//! `truststore_password`, `keystore`, `keystore_password` and optionally a
//! comma separated `brokers` list. Unknown keys are ignored. Missing
//! credentials are left empty so the validator reports them.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::types::{ClientConfig, HttpConfig, QueueConfig};
use super::validate::ConfigError;

/// Section holding the client settings.
pub const SECTION: &str = "cloudlog";

impl ClientConfig {
    /// Load a configuration from an INI file.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| ConfigError::File {
            path: path.to_path_buf(),
            reason: match err.kind() {
                ErrorKind::NotFound => "file does not exist".into(),
                _ => err.to_string(),
            },
        })?;
        Self::from_ini_str(&text).map_err(|err| match err {
            ConfigError::File { reason, .. } => ConfigError::File {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Load a configuration from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|err| ConfigError::File {
            path: "<string>".into(),
            reason: err.to_string(),
        })?;
        let section = ini
            .section(Some(SECTION))
            .ok_or_else(|| ConfigError::File {
                path: "<string>".into(),
                reason: format!("missing [{SECTION}] section"),
            })?;

        match get(section, "transport").unwrap_or("http") {
            "http" => http_from_section(section).map(Self::Http),
            "queue" | "kafka" => queue_from_section(section).map(Self::Queue),
            other => Err(ConfigError::InvalidSetting(format!(
                "unknown transport {other:?}; expected \"queue\" or \"http\""
            ))),
        }
    }
}

fn http_from_section(section: &Properties) -> Result<HttpConfig, ConfigError> {
    let mut config = HttpConfig::new(
        get(section, "index").unwrap_or_default(),
        get(section, "token").unwrap_or_default(),
    );
    if let Some(base) = get(section, "api_base") {
        config = config.with_api_base(base);
    }
    if let Some(timeout) = millis(section, "connect_timeout_ms")? {
        config = config.with_connect_timeout(timeout);
    }
    if let Some(timeout) = millis(section, "request_timeout_ms")? {
        config = config.with_request_timeout(timeout);
    }
    Ok(config)
}

fn queue_from_section(section: &Properties) -> Result<QueueConfig, ConfigError> {
    let mut config = QueueConfig::new(
        get(section, "index").unwrap_or_default(),
        get(section, "truststore").unwrap_or_default(),
        get(section, "truststore_password").unwrap_or_default(),
        get(section, "keystore").unwrap_or_default(),
        get(section, "keystore_password").unwrap_or_default(),
    );
    if let Some(brokers) = get(section, "brokers") {
        config = config.with_brokers(brokers.split(',').map(str::trim).filter(|b| !b.is_empty()));
    }
    if let Some(retries) = number::<u32>(section, "retries")? {
        config = config.with_retries(retries);
    }
    if let Some(capacity) = number::<usize>(section, "capacity")? {
        config = config.with_capacity(capacity);
    }
    if let Some(timeout) = millis(section, "ack_timeout_ms")? {
        config = config.with_ack_timeout(timeout);
    }
    if let Some(timeout) = millis(section, "flush_timeout_ms")? {
        config = config.with_flush_timeout(timeout);
    }
    Ok(config)
}

fn get<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim)
}

fn number<T: FromStr>(section: &Properties, key: &str) -> Result<Option<T>, ConfigError> {
    get(section, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                ConfigError::InvalidSetting(format!(
                    "{key} must be a non-negative integer, got {raw:?}"
                ))
            })
        })
        .transpose()
}

fn millis(section: &Properties, key: &str) -> Result<Option<Duration>, ConfigError> {
    Ok(number::<u64>(section, key)?.map(Duration::from_millis))
}
