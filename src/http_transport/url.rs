//! Ingestion URL construction.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped when the index is embedded as a path segment.
///
/// Unreserved characters (alphanumeric, `-`, `_`, `.`, `~`) pass through so
/// ordinary index identifiers appear unchanged.
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Build `<api_base>/v1/index/<index>/data`.
pub(super) fn ingestion_url(api_base: &str, index: &str) -> String {
    format!(
        "{}/v1/index/{}/data",
        api_base.trim().trim_end_matches('/'),
        utf8_percent_encode(index, PATH_SEGMENT_ENCODE_SET)
    )
}
