//! Publisher type handed to the client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::{thread, time::Duration};

use crossbeam_channel::{Receiver, Sender, bounded};
use log::warn;

use crate::{
    config::QueueConfig,
    rate_limited_warner::RateLimitedWarner,
    transport::{Transport, TransportError, TransportKind},
};

use super::{
    producer::BrokerProducer,
    worker::{
        Delivery, DeliveryReport, QueueCommand, ReportSink, WorkerSettings, enqueue_delivery,
        flush_queue, shutdown_worker, spawn_worker,
    },
};

/// Asynchronous, one-message-per-event broker publisher.
///
/// [`publish`](Transport::publish) returns as soon as every event is queued
/// for the worker thread. Outcomes are observed through
/// [`delivery_reports`](Transport::delivery_reports).
pub struct QueuePublisher {
    index: String,
    tx: Option<Sender<QueueCommand>>,
    handle: Option<thread::JoinHandle<()>>,
    reports: Receiver<DeliveryReport>,
    subscribed: Arc<AtomicBool>,
    sequence: AtomicU64,
    warner: RateLimitedWarner,
    enqueue_timeout: Duration,
    flush_timeout: Duration,
}

impl QueuePublisher {
    /// Start the worker thread that owns `producer`.
    pub fn new(config: &QueueConfig, producer: Box<dyn BrokerProducer>) -> Self {
        let (report_tx, reports) = bounded(config.report_capacity);
        let subscribed = Arc::new(AtomicBool::new(false));
        let settings = WorkerSettings {
            index: config.index.clone(),
            capacity: config.capacity,
            retries: config.retries,
            backoff: config.backoff.clone(),
        };
        let sink = ReportSink {
            tx: report_tx,
            subscribed: Arc::clone(&subscribed),
        };
        let (tx, handle) = spawn_worker(settings, producer, sink);
        Self {
            index: config.index.clone(),
            tx: Some(tx),
            handle: Some(handle),
            reports,
            subscribed,
            sequence: AtomicU64::new(0),
            warner: RateLimitedWarner::with_default_interval("publish queue full"),
            enqueue_timeout: config.enqueue_timeout,
            flush_timeout: config.flush_timeout,
        }
    }

    /// Topic every event is published to.
    pub fn index(&self) -> &str {
        &self.index
    }

    fn join_worker(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("cloudlog: queue worker thread panicked");
        }
    }
}

impl Transport for QueuePublisher {
    fn kind(&self) -> TransportKind {
        TransportKind::Queue
    }

    fn publish(&self, events: Vec<String>) -> Result<(), TransportError> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(TransportError::Closed);
        };
        for payload in events {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            let delivery = Delivery { sequence, payload };
            enqueue_delivery(tx, delivery, self.enqueue_timeout, &self.warner)?;
        }
        Ok(())
    }

    fn flush(&self) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        self.warner.flush();
        flush_queue(tx, self.flush_timeout)
    }

    fn close(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        if shutdown_worker(tx, self.flush_timeout) {
            self.join_worker();
        } else {
            // The worker is still retrying; leave it to finish detached.
            warn!(
                "cloudlog: queue worker for {} did not drain within {:?}",
                self.index, self.flush_timeout
            );
            self.handle = None;
        }
    }

    /// Reports are produced only after the first call, for events attempted
    /// from then on. Reports that do not fit in the bounded channel are
    /// discarded with a rate-limited warning.
    fn delivery_reports(&self) -> Option<Receiver<DeliveryReport>> {
        self.subscribed.store(true, Ordering::Release);
        Some(self.reports.clone())
    }
}

impl Drop for QueuePublisher {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for QueuePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuePublisher")
            .field("index", &self.index)
            .field("closed", &self.tx.is_none())
            .finish_non_exhaustive()
    }
}
