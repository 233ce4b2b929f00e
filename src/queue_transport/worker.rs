//! Worker thread driving broker I/O.
//!
//! The publisher hands events to the worker through a bounded channel. The
//! worker sends each one as its own broker message, retries failures with
//! jittered backoff up to the configured count, and reports every outcome.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TryRecvError, TrySendError, bounded};
use log::warn;

use crate::{
    config::RetryBackoff, rate_limited_warner::RateLimitedWarner, transport::TransportError,
};

use super::{backoff::RetryDelays, producer::BrokerProducer};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub enum QueueCommand {
    Publish(Delivery),
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

/// One enriched event awaiting delivery.
#[derive(Debug)]
pub struct Delivery {
    pub sequence: u64,
    pub payload: String,
}

/// Outcome of publishing one event through the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Position of the event among everything published by the client.
    pub sequence: u64,
    /// Topic the event was published to.
    pub index: String,
    /// The enriched event.
    pub payload: String,
    /// `Ok` once the broker acknowledged the event, or the last error after
    /// retries were exhausted.
    pub result: Result<(), TransportError>,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Settings the worker needs from the queue configuration.
pub struct WorkerSettings {
    pub index: String,
    pub capacity: usize,
    pub retries: u32,
    pub backoff: RetryBackoff,
}

/// Where delivery reports go and whether anyone is listening.
#[derive(Clone)]
pub struct ReportSink {
    pub tx: Sender<DeliveryReport>,
    pub subscribed: Arc<AtomicBool>,
}

/// Spawn the worker thread that owns `producer`.
pub fn spawn_worker(
    settings: WorkerSettings,
    producer: Box<dyn BrokerProducer>,
    reports: ReportSink,
) -> (Sender<QueueCommand>, thread::JoinHandle<()>) {
    let (tx, rx) = bounded(settings.capacity);
    let handle = thread::spawn(move || Worker::new(settings, producer, reports).run(rx));
    (tx, handle)
}

struct Worker {
    index: String,
    retries: u32,
    producer: Box<dyn BrokerProducer>,
    delays: RetryDelays,
    reports: ReportSink,
    warner: RateLimitedWarner,
}

impl Worker {
    fn new(
        settings: WorkerSettings,
        producer: Box<dyn BrokerProducer>,
        reports: ReportSink,
    ) -> Self {
        Self {
            index: settings.index,
            retries: settings.retries,
            producer,
            delays: RetryDelays::new(settings.backoff),
            reports,
            warner: RateLimitedWarner::with_default_interval("delivery-report channel full"),
        }
    }

    fn handle_delivery(&mut self, delivery: Delivery) {
        let result = self.send_with_retries(&delivery.payload);
        if let Err(err) = &result {
            warn!(
                "cloudlog: dropping event {} for {} after {} attempts: {err}",
                delivery.sequence,
                self.index,
                self.retries + 1
            );
        }
        self.report(DeliveryReport {
            sequence: delivery.sequence,
            index: self.index.clone(),
            payload: delivery.payload,
            result,
        });
    }

    fn send_with_retries(&mut self, payload: &str) -> Result<(), TransportError> {
        self.delays.reset();
        let mut attempt = 0;
        loop {
            match self.producer.send(&self.index, payload) {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= self.retries => return Err(err),
                Err(err) => {
                    attempt += 1;
                    let delay = self.delays.next_delay();
                    log::debug!(
                        "cloudlog: send to {} failed ({err}); retry {attempt}/{} in {delay:?}",
                        self.index,
                        self.retries
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    fn report(&self, report: DeliveryReport) {
        if !self.reports.subscribed.load(Ordering::Acquire) {
            return;
        }
        match self.reports.tx.try_send(report) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                self.warner.record_drop();
            }
        }
    }

    fn drain_pending(&mut self, rx: &Receiver<QueueCommand>) {
        loop {
            match rx.try_recv() {
                Ok(QueueCommand::Publish(delivery)) => self.handle_delivery(delivery),
                Ok(QueueCommand::Flush(ack)) | Ok(QueueCommand::Shutdown(ack)) => {
                    let _ = ack.send(());
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn run(mut self, rx: Receiver<QueueCommand>) {
        loop {
            match rx.recv() {
                Ok(QueueCommand::Publish(delivery)) => self.handle_delivery(delivery),
                Ok(QueueCommand::Flush(ack)) => {
                    let _ = ack.send(());
                }
                Ok(QueueCommand::Shutdown(ack)) => {
                    self.drain_pending(&rx);
                    self.producer.close();
                    let _ = ack.send(());
                    break;
                }
                Err(_) => {
                    self.drain_pending(&rx);
                    self.producer.close();
                    break;
                }
            }
        }
        self.warner.flush();
    }
}

/// Hand one event to the worker, waiting at most `timeout` for queue space.
///
/// # Errors
///
/// * [`TransportError::QueueFull`] - the queue stayed full for `timeout`
/// * [`TransportError::Closed`] - the worker has shut down
pub fn enqueue_delivery(
    tx: &Sender<QueueCommand>,
    delivery: Delivery,
    timeout: Duration,
    warner: &RateLimitedWarner,
) -> Result<(), TransportError> {
    match tx.send_timeout(QueueCommand::Publish(delivery), timeout) {
        Ok(()) => Ok(()),
        Err(SendTimeoutError::Timeout(_)) => {
            warner.record_drop();
            Err(TransportError::QueueFull)
        }
        Err(SendTimeoutError::Disconnected(_)) => Err(TransportError::Closed),
    }
}

/// Send a flush command and wait for the worker to reach it.
///
/// The worker processes commands in order, so the acknowledgement arrives
/// once every earlier event has been attempted. Returns `false` if that does
/// not happen within `timeout`.
pub fn flush_queue(tx: &Sender<QueueCommand>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let (ack_tx, ack_rx) = bounded(1);
    if tx
        .send_timeout(QueueCommand::Flush(ack_tx), timeout)
        .is_err()
    {
        return false;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    ack_rx.recv_timeout(remaining).is_ok()
}

/// Ask the worker to drain and stop, waiting at most `timeout`.
pub fn shutdown_worker(tx: Sender<QueueCommand>, timeout: Duration) -> bool {
    let (ack_tx, ack_rx) = bounded(1);
    if tx
        .send_timeout(QueueCommand::Shutdown(ack_tx), timeout)
        .is_err()
    {
        return false;
    }
    ack_rx.recv_timeout(timeout).is_ok()
}
