//! Error types for broker operations.

use thiserror::Error;

/// Errors raised by a broker handle.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Broker unreachable at startup.
    #[error("failed to connect to broker {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: rdkafka::error::KafkaError,
    },

    /// A single publish call failed.
    #[error("publish to broker {addr} failed: {source}")]
    Publish {
        addr: String,
        #[source]
        source: rdkafka::error::KafkaError,
    },

    /// Flushing or tearing down the connection failed.
    #[error("failed to close broker {addr}: {source}")]
    Close {
        addr: String,
        #[source]
        source: rdkafka::error::KafkaError,
    },

    /// Declaring the queue's backing topic failed.
    #[error("topic creation on broker {addr} failed: {reason}")]
    TopicCreation { addr: String, reason: String },

    /// Publish attempted before a successful connect.
    #[error("broker {0} is not connected")]
    NotConnected(String),
}
