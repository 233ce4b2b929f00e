//! Message-broker transport.
//!
//! [`QueuePublisher`] owns a worker thread that publishes every event as its
//! own broker message on the topic named by the index, without a key. The
//! publishing call returns once events are queued; the broker outcome for
//! each one arrives later as a [`DeliveryReport`].
//!
//! # Retry Semantics
//!
//! A failed send is retried up to `retries` times (10 by default) with
//! jittered exponential backoff. After the last failure the event is dropped,
//! a warning is logged and a failed report is emitted. Failures never reach
//! the call that published the event.
//!
//! # Broker
//!
//! [`KafkaProducer`] is the production [`BrokerProducer`]: mutual TLS from a
//! PKCS#12 keystore and a PKCS#12 or PEM truststore, `acks=all` and gzip
//! compression. Any other broker can be plugged in through
//! [`Client::queue_with_producer`](crate::Client::queue_with_producer).

mod backoff;
mod kafka_producer;
mod producer;
mod publisher;
mod tls;
mod worker;


pub use kafka_producer::KafkaProducer;
pub use producer::BrokerProducer;
pub use publisher::QueuePublisher;
pub use worker::DeliveryReport;
