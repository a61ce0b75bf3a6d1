//! uuid-producer library
//!
//! Produces a continuous stream of unique identifiers and fans them out,
//! concurrently, to one or more message-broker endpoints. Intended for
//! load-testing or seeding message-queue infrastructure with high volumes of
//! uniquely identifiable messages.
//!
//! # Architecture
//!
//! ```text
//! SnowflakeGenerator ──▶ feeder tasks ──▶ per-worker bounded channels
//!                                               │
//!                                               ▼
//!                                         worker tasks ──▶ every connected broker
//!                                               │
//!                                               ▼
//!                                        results channel ──▶ drain loop (first error wins)
//! ```
//!
//! Each worker owns a private bounded channel fed by an independent feeder
//! task; workers publish every identifier they consume to every connected
//! broker. Brokers that failed to connect at startup are kept as absent slots
//! and skipped during publish, not retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use uuid_generator::GeneratorConfig;
//! use uuid_producer::Producer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let addresses = vec!["localhost:9092".to_string()];
//!     let producer = Producer::connect(&addresses, GeneratorConfig::default(), 4).await;
//!     let summary = producer.run("uuids", 1_000_000).await?;
//!     println!("{}", summary.summary_line());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod producer;
pub mod report;

// Re-exports for convenience
pub use config::{load_brokers_file, Args};
pub use error::ProducerError;
pub use metrics::{MetricsSink, NoopSink, TracingSink};
pub use producer::Producer;
pub use report::RunSummary;
