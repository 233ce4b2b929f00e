//! Broker capability used by the queue worker.

use crate::transport::TransportError;

/// A synchronous, durable publish operation against a message broker.
///
/// The queue worker owns the producer and calls [`send`](Self::send) once per
/// attempt, so implementations need not be thread safe beyond `Send`.
/// Retrying is the worker's job; an implementation reports each failure as it
/// happens.
pub trait BrokerProducer: Send {
    /// Publish `payload` to `topic` without a message key.
    fn send(&mut self, topic: &str, payload: &str) -> Result<(), TransportError>;

    /// Release broker connections. Called once when the publisher shuts down.
    fn close(&mut self) {}
}

impl<P: BrokerProducer + ?Sized> BrokerProducer for Box<P> {
    fn send(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        (**self).send(topic, payload)
    }

    fn close(&mut self) {
        (**self).close();
    }
}
