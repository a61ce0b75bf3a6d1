//! Cryptographically secure random values for identifier construction.
//!
//! Values are drawn from the operating system's secure source (`OsRng`).
//! Because a syscall per identifier is comparatively expensive, the source can
//! optionally run in buffered mode: a dedicated thread keeps a bounded FIFO
//! topped up, and `next` drains it without blocking. A buffer miss falls back
//! to a synchronous draw, so the critical path never waits on the refill
//! thread.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Mutex, PoisonError};

use rand::rngs::OsRng;
use rand::TryRngCore;
use tracing::warn;

use crate::snowflake::GeneratorError;

/// Capacity of the pre-generated value buffer.
const BUFFER_CAPACITY: usize = 1024;

/// Fixed-range secure random source: every value lies in `[0, 2^63)`.
pub struct RandomSource {
    buffer: Option<Mutex<Receiver<i64>>>,
}

impl RandomSource {
    /// A source that performs one synchronous draw per call.
    pub fn direct() -> Self {
        Self { buffer: None }
    }

    /// A source backed by an asynchronously refilled FIFO buffer.
    ///
    /// The refill thread exits once the source is dropped (its send fails).
    pub fn buffered() -> Self {
        let (tx, rx) = sync_channel(BUFFER_CAPACITY);
        std::thread::spawn(move || refill_loop(tx));
        Self {
            buffer: Some(Mutex::new(rx)),
        }
    }

    /// Next random value, drained from the buffer when one is ready.
    pub fn next(&self) -> Result<i64, GeneratorError> {
        if let Some(buffer) = &self.buffer {
            let rx = buffer.lock().unwrap_or_else(PoisonError::into_inner);
            if let Ok(value) = rx.try_recv() {
                return Ok(value);
            }
        }
        draw()
    }
}

/// One synchronous draw from the secure source.
fn draw() -> Result<i64, GeneratorError> {
    let value = OsRng
        .try_next_u64()
        .map_err(|e| GeneratorError::RandomSource(e.to_string()))?;
    Ok((value >> 1) as i64)
}

fn refill_loop(tx: SyncSender<i64>) {
    loop {
        match draw() {
            Ok(value) => {
                if tx.send(value).is_err() {
                    // Generator dropped; nothing left to refill.
                    return;
                }
            }
            Err(e) => warn!("random buffer refill failed: {e}"),
        }
    }
}
