//! Log output of the broker worker.
//!
//! Kept in its own binary because `logtest` installs a process-wide logger.
//! The tests share that logger, so they run one at a time.

use std::sync::Once;
use std::time::Duration;

use cloudlog_rs::Client;
use cloudlog_rs::test_utils::{FailingProducer, RecordingProducer, TestCredentials};
use logtest::{Logger, Record};
use rstest::rstest;
use serial_test::serial;

mod test_utils;
use test_utils::{credentials, fast_queue_config};

static LOGGER: Once = Once::new();

/// Install the capturing logger once per process and discard anything an
/// earlier test left behind.
fn logger() -> Logger {
    LOGGER.call_once(|| {
        Logger::start();
    });
    let mut logger = Logger;
    while logger.pop().is_some() {}
    logger
}

fn drain(logger: &mut Logger) -> Vec<Record> {
    logger.by_ref().collect()
}

#[rstest]
#[serial]
fn dropped_event_logs_a_warning(credentials: TestCredentials) {
    let mut logger = logger();
    let producer = FailingProducer::always();
    let client = Client::queue_with_producer(
        fast_queue_config(&credentials, "audit", 2),
        producer.clone(),
    )
    .expect("queue client");

    client.push_event("lost").expect("queued");
    assert!(client.flush());
    client.close();
    assert_eq!(producer.attempts(), 3);

    let records = drain(&mut logger);
    let retries: Vec<_> = records
        .iter()
        .filter(|r| r.args().contains("retry"))
        .collect();
    assert_eq!(retries.len(), 2);
    assert!(retries.iter().all(|r| r.level() == log::Level::Debug));
    let warning = records
        .iter()
        .find(|r| r.args().contains("dropping event"))
        .expect("no drop warning logged");
    assert_eq!(warning.level(), log::Level::Warn);
    assert!(warning.args().contains("for audit after 3 attempts"));
    assert!(warning.args().contains("simulated failure 3"));

    // Closing twice logs nothing new.
    client.close();
    std::thread::sleep(Duration::from_millis(10));
    assert!(logger.pop().is_none());
}

#[rstest]
#[serial]
fn full_report_channel_logs_discarded_reports(credentials: TestCredentials) {
    let mut logger = logger();
    let config = fast_queue_config(&credentials, "audit", 0).with_report_capacity(1);
    let client =
        Client::queue_with_producer(config, RecordingProducer::new()).expect("queue client");
    let reports = client.delivery_reports().expect("queue reports");

    client.push_events(&["a", "b", "c"]).expect("queued");
    assert!(client.flush());
    client.close();
    assert_eq!(reports.try_iter().count(), 1);

    let warnings: Vec<_> = drain(&mut logger)
        .into_iter()
        .filter(|r| r.args().contains("delivery-report channel full"))
        .collect();
    assert!(!warnings.is_empty(), "no report-channel warning logged");
    assert!(warnings.iter().all(|r| r.level() == log::Level::Warn));
    let discarded: u64 = warnings
        .iter()
        .filter_map(|r| r.args().rsplit(' ').next()?.parse::<u64>().ok())
        .sum();
    assert_eq!(discarded, 2);
}
