//! Event enrichment.
//!
//! Every event leaving the client is normalised into a JSON object and
//! stamped with the fields the logging backend relies on:
//!
//! - `message`: the raw input, added only when the input is not a JSON object.
//! - `timestamp`: epoch milliseconds, added only when absent.
//! - `cloudlog_client_type`: the transport kind, always overwritten.
//! - `cloudlog_source_host`: the local hostname, always overwritten.
//!
//! Parsing failures are not errors. Anything that is not a JSON object is
//! wrapped under `message` verbatim.

use serde_json::{Map, Value};
use sysinfo::System;

/// Field holding the raw text of non-JSON events.
pub const MESSAGE_FIELD: &str = "message";
/// Field holding the event time in epoch milliseconds.
pub const TIMESTAMP_FIELD: &str = "timestamp";
/// Field identifying the transport kind that shipped the event.
pub const CLIENT_TYPE_FIELD: &str = "cloudlog_client_type";
/// Field identifying the host that produced the event.
pub const SOURCE_HOST_FIELD: &str = "cloudlog_source_host";

/// Fixed enrichment inputs captured when a client is constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventMetadata {
    /// Transport identifier written to `cloudlog_client_type`.
    pub client_type: String,
    /// Hostname written to `cloudlog_source_host`.
    pub hostname: String,
}

impl EventMetadata {
    /// Bundle a client type with an explicit hostname.
    pub fn new(client_type: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            client_type: client_type.into(),
            hostname: hostname.into(),
        }
    }

    /// Bundle a client type with the hostname of the current machine.
    pub fn for_local_host(client_type: impl Into<String>) -> Self {
        Self::new(client_type, resolve_hostname())
    }

    /// Enrich `raw` with this metadata and the supplied timestamp.
    pub fn enrich(&self, raw: &str, timestamp: i64) -> String {
        enrich(raw, timestamp, &self.client_type, &self.hostname)
    }
}

/// Normalise `raw` into a JSON object and stamp the metadata fields.
///
/// Returns the serialised object. Field order follows the input object, with
/// added fields appended in the order `message`, `timestamp`,
/// `cloudlog_client_type`, `cloudlog_source_host`.
///
/// # Examples
///
/// ```
/// use cloudlog_rs::enrich::enrich;
///
/// let event = enrich("test", 1, "http", "h1");
/// assert_eq!(
///     event,
///     r#"{"message":"test","timestamp":1,"cloudlog_client_type":"http","cloudlog_source_host":"h1"}"#
/// );
/// ```
pub fn enrich(raw: &str, timestamp: i64, client_type: &str, hostname: &str) -> String {
    let mut record = base_record(raw);
    if !record.contains_key(TIMESTAMP_FIELD) {
        record.insert(TIMESTAMP_FIELD.into(), Value::from(timestamp));
    }
    record.insert(CLIENT_TYPE_FIELD.into(), Value::from(client_type));
    record.insert(SOURCE_HOST_FIELD.into(), Value::from(hostname));
    Value::Object(record).to_string()
}

fn base_record(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert(MESSAGE_FIELD.into(), Value::from(raw));
            map
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
///
/// Read once per publish call so that every event of a batch shares it.
pub fn current_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Resolve the local hostname, or an empty string when it is unavailable.
pub fn resolve_hostname() -> String {
    match System::host_name() {
        Some(name) => name,
        None => {
            log::debug!("cloudlog: hostname resolution failed; using empty source host");
            String::new()
        }
    }
}
