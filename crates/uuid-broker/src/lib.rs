//! Broker capability for the uuid-producer pipeline.
//!
//! The pipeline only needs four things from a publish target: connect once,
//! publish raw bytes to a named queue, close, and a stable identity for logs
//! and error attribution. The [`Broker`] trait captures exactly that, and
//! [`KafkaBroker`] implements it on top of `rdkafka`, with the queue name
//! mapped to a Kafka topic that is declared lazily on first publish.
//!
//! Connect failures are meant to be non-fatal to a run: the coordinator logs
//! them and keeps the corresponding handle absent instead of aborting.

pub mod broker;
pub mod error;
pub mod kafka;

// Re-exports for convenience
pub use broker::Broker;
pub use error::BrokerError;
pub use kafka::KafkaBroker;
