//! Error types for the publish pipeline.

use thiserror::Error;

/// Errors surfaced by the publish coordinator.
///
/// Connection failures never appear here: they degrade the broker to an
/// absent slot at construction. What `run` returns is the first failure seen
/// by the drain loop, which is drain order, not necessarily occurrence order.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// A single publish call failed, tagged with worker and broker identity.
    #[error("worker {worker}: publish to broker {broker} failed: {source}")]
    Publish {
        worker: usize,
        broker: String,
        #[source]
        source: uuid_broker::BrokerError,
    },

    /// A feeder exhausted its generation retries for one identifier slot.
    #[error("worker {worker}: identifier generation failed after {attempts} attempts: {source}")]
    Generate {
        worker: usize,
        attempts: u32,
        #[source]
        source: uuid_generator::GeneratorError,
    },

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error (brokers file, summary output).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
