//! Snowflake-style generator with hashed output.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha512};

use crate::clock::{Clock, SystemClock};
use crate::random::RandomSource;

/// 12-bit sequence counter: up to 4096 identifiers per millisecond.
const SEQUENCE_MASK: u16 = 0xFFF;

/// Error type for identifier generation.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Secure randomness unavailable for this attempt. Callers retry or
    /// abort; the generator never substitutes a fixed value.
    #[error("secure random source unavailable: {0}")]
    RandomSource(String),
}

/// The identifier-generation capability consumed by the publish pipeline.
pub trait IdGenerator: Send + Sync {
    /// Mint one identifier for the supplied instant.
    fn generate(&self, now: DateTime<Utc>) -> Result<String, GeneratorError>;
}

/// Configuration for a [`SnowflakeGenerator`].
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Numeric id baked into every identifier from this generator.
    pub id: i64,
    /// Epoch that timestamps are measured against. The default (Unix epoch)
    /// makes the timestamp component plain Unix milliseconds.
    pub epoch: DateTime<Utc>,
    /// Include a secure random component in each identifier.
    pub use_random: bool,
    /// Pre-generate random values on a background thread.
    pub use_buffer: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            id: 1,
            epoch: DateTime::<Utc>::UNIX_EPOCH,
            use_random: true,
            use_buffer: true,
        }
    }
}

/// Mutable clock state, guarded by the generator's lock.
struct ClockState {
    sequence: u16,
    last_timestamp: i64,
}

/// Generator of collision-resistant textual identifiers.
///
/// Each call combines `(millis, id, sequence, random)` into a decimal inputs
/// string and returns its SHA-512 digest as 128 lowercase hex characters.
/// The state mutation (sequence advance, last-timestamp update) runs under a
/// per-instance lock; the random draw happens outside it so a slow secure
/// source never serializes concurrent callers behind the lock.
pub struct SnowflakeGenerator<C = SystemClock> {
    id: i64,
    epoch_millis: i64,
    use_random: bool,
    state: Mutex<ClockState>,
    random: RandomSource,
    clock: C,
}

impl SnowflakeGenerator<SystemClock> {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SnowflakeGenerator<C> {
    /// Build a generator with an explicit clock, used by the sequence-wrap
    /// spin to re-sample the current time.
    pub fn with_clock(config: GeneratorConfig, clock: C) -> Self {
        let random = if config.use_buffer {
            RandomSource::buffered()
        } else {
            RandomSource::direct()
        };
        Self {
            id: config.id,
            epoch_millis: config.epoch.timestamp_millis(),
            use_random: config.use_random,
            state: Mutex::new(ClockState {
                sequence: 0,
                last_timestamp: -1,
            }),
            random,
            clock,
        }
    }

    /// Mint an identifier for the supplied instant.
    pub fn generate(&self, now: DateTime<Utc>) -> Result<String, GeneratorError> {
        let now_millis = now.timestamp_millis() - self.epoch_millis;
        let (millis, sequence) = self.advance(now_millis);

        let mut parts = vec![millis, self.id, i64::from(sequence)];
        if self.use_random {
            parts.push(self.random.next()?);
        }
        Ok(hash(&construct(&parts)))
    }

    /// Mint an identifier using the generator's own clock.
    pub fn generate_now(&self) -> Result<String, GeneratorError> {
        let now_millis = self.clock.now_millis() - self.epoch_millis;
        let (millis, sequence) = self.advance(now_millis);

        let mut parts = vec![millis, self.id, i64::from(sequence)];
        if self.use_random {
            parts.push(self.random.next()?);
        }
        Ok(hash(&construct(&parts)))
    }

    /// Timestamp (millis since the configured epoch) of the last identifier.
    pub fn last_timestamp(&self) -> i64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_timestamp
    }

    /// Sequence counter value used by the last identifier.
    pub fn sequence(&self) -> u16 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sequence
    }

    /// Advance the (timestamp, sequence) state and return the pair to embed.
    ///
    /// Any sample at or before the last issued timestamp counts as "no
    /// forward progress": the sequence increments and the identifier reuses
    /// `last_timestamp`, so a backward clock jump can never repeat a pair.
    fn advance(&self, now: i64) -> (i64, u16) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let millis = if now <= state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted within this millisecond: wait for the
                // clock to move past the last issued timestamp.
                self.spin_past(state.last_timestamp)
            } else {
                state.last_timestamp
            }
        } else {
            state.sequence = 0;
            now
        };
        state.last_timestamp = millis;
        (millis, state.sequence)
    }

    fn spin_past(&self, last: i64) -> i64 {
        let mut now = self.clock.now_millis() - self.epoch_millis;
        while now <= last {
            std::thread::yield_now();
            now = self.clock.now_millis() - self.epoch_millis;
        }
        now
    }
}

impl<C: Clock> IdGenerator for SnowflakeGenerator<C> {
    fn generate(&self, now: DateTime<Utc>) -> Result<String, GeneratorError> {
        SnowflakeGenerator::generate(self, now)
    }
}

/// Decimal concatenation of identifier components, with no separators.
fn construct(parts: &[i64]) -> String {
    let mut inputs = String::new();
    for part in parts {
        inputs.push_str(&part.to_string());
    }
    inputs
}

/// SHA-512 digest of the inputs string as lowercase hex.
fn hash(inputs: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(inputs.as_bytes());
    hex::encode(hasher.finalize())
}
