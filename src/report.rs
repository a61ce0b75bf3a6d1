//! Run summary reporting.

use serde::{Deserialize, Serialize};

/// Outcome of a completed run, serializable for post-processing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identifiers requested by the caller.
    pub requested: u64,
    /// Identifiers actually dispatched to workers.
    pub dispatched: u64,
    /// Publish attempts across all workers and connected brokers.
    pub publish_attempts: u64,
    /// Brokers connected at construction.
    pub connected_brokers: usize,
    /// Brokers that failed to connect and were skipped.
    pub absent_brokers: usize,
    /// Worker count used for the run.
    pub workers: usize,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

impl RunSummary {
    /// Identifiers dispatched per second of wall-clock time.
    pub fn identifiers_per_second(&self) -> f64 {
        if self.duration_ms > 0 {
            self.dispatched as f64 * 1000.0 / self.duration_ms as f64
        } else {
            0.0
        }
    }

    /// One-line human summary for logging.
    pub fn summary_line(&self) -> String {
        format!(
            "dispatched {}/{} identifiers across {} workers to {} brokers ({} absent) \
             in {}ms ({:.2} ids/sec, {} publish attempts)",
            self.dispatched,
            self.requested,
            self.workers,
            self.connected_brokers,
            self.absent_brokers,
            self.duration_ms,
            self.identifiers_per_second(),
            self.publish_attempts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_computed_from_dispatched_count() {
        let summary = RunSummary {
            requested: 1000,
            dispatched: 1000,
            duration_ms: 10_000,
            ..RunSummary::default()
        };
        assert_eq!(summary.identifiers_per_second(), 100.0);
    }

    #[test]
    fn zero_duration_yields_zero_rate() {
        let summary = RunSummary::default();
        assert_eq!(summary.identifiers_per_second(), 0.0);
    }

    #[test]
    fn summary_line_mentions_the_key_counts() {
        let summary = RunSummary {
            requested: 10,
            dispatched: 10,
            publish_attempts: 20,
            connected_brokers: 2,
            absent_brokers: 1,
            workers: 2,
            duration_ms: 5,
        };
        let line = summary.summary_line();
        assert!(line.contains("10/10"));
        assert!(line.contains("20 publish attempts"));
    }
}
