//! Batch envelope for the ingestion endpoint.

/// Wrap serialised events as `{"records":[ev1,ev2,...]}`.
///
/// Events are spliced in as raw JSON fragments. They are expected to be the
/// output of [`enrich`](crate::enrich::enrich) and are not parsed again.
pub(super) fn records_envelope(events: &[String]) -> String {
    let payload_len: usize = events.iter().map(|e| e.len() + 1).sum();
    let mut body = String::with_capacity(payload_len + 14);
    body.push_str("{\"records\":[");
    for (i, event) in events.iter().enumerate() {
        if i > 0 {
            body.push(',');
        }
        body.push_str(event);
    }
    body.push_str("]}");
    body
}
