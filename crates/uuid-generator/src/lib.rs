//! Identifier generator for the uuid-producer pipeline.
//!
//! This crate provides the `SnowflakeGenerator`, which mints collision-resistant
//! textual identifiers by combining a millisecond timestamp, a per-generator
//! numeric id, a 12-bit per-millisecond sequence counter, and a
//! cryptographically secure random value, then condensing the tuple through
//! SHA-512 into a fixed-length lowercase hex digest.
//!
//! # Architecture
//!
//! ```text
//!  now (millis)  ──┐
//!  generator id ──┤
//!  sequence     ──┼──▶ construct() ──▶ "16995…17423…"  ──▶ SHA-512 ──▶ 128-char hex
//!  random       ──┘      (decimal concatenation)
//! ```
//!
//! The (timestamp, sequence) pair is unique per generator instance: within one
//! millisecond the sequence strictly increases, and when it wraps the generator
//! spin-waits until the clock moves past the last issued timestamp. Uniqueness
//! therefore holds even if the random and id components are held constant.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use uuid_generator::{GeneratorConfig, SnowflakeGenerator};
//!
//! let generator = SnowflakeGenerator::new(GeneratorConfig::default());
//! let id = generator.generate(Utc::now()).unwrap();
//! assert_eq!(id.len(), 128);
//! ```

pub mod clock;
pub mod random;
pub mod snowflake;

// Re-exports for convenience
pub use clock::{Clock, SystemClock};
pub use random::RandomSource;
pub use snowflake::{GeneratorConfig, GeneratorError, IdGenerator, SnowflakeGenerator};
