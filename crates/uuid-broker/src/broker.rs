//! The broker capability consumed by the publish pipeline.

use async_trait::async_trait;

use crate::error::BrokerError;

/// A single publish target.
///
/// Implementations own the wire-level connection; the pipeline never inspects
/// connection internals. A failed `connect` degrades the handle to "unusable
/// for this run" rather than aborting the whole run.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Establish the connection. Called once, at coordinator construction.
    async fn connect(&mut self) -> Result<(), BrokerError>;

    /// Publish a payload to the named queue.
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Close the connection, flushing any in-flight messages.
    async fn close(&self) -> Result<(), BrokerError>;

    /// Stable identity (the configured address) for logs and errors.
    fn identity(&self) -> &str;
}
