//! Fixtures shared by the integration tests: throwaway TLS material and a
//! queue configuration tuned so retries finish in milliseconds.

use std::time::Duration;

use cloudlog_rs::test_utils::TestCredentials;
use cloudlog_rs::{QueueConfig, RetryBackoff};
use rstest::fixture;

pub const PASSWORD: &str = "changeit";

/// Self-signed truststore and keystore protected by [`PASSWORD`].
#[fixture]
pub fn credentials() -> TestCredentials {
    TestCredentials::generate(PASSWORD)
}

/// Queue configuration pointing at `creds` with a short retry schedule.
///
/// # Arguments
/// * `retries` - how many times a failed send is retried.
pub fn fast_queue_config(creds: &TestCredentials, index: &str, retries: u32) -> QueueConfig {
    QueueConfig::new(
        index,
        creds.truststore(),
        PASSWORD,
        creds.keystore(),
        PASSWORD,
    )
    .with_retries(retries)
    .with_backoff(RetryBackoff {
        base: Duration::from_millis(1),
        cap: Duration::from_millis(4),
    })
    .with_flush_timeout(Duration::from_secs(5))
}
