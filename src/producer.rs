//! Publish coordinator: connects brokers, partitions work across a worker
//! pool, and fans generated identifiers out to every connected broker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid_broker::{Broker, KafkaBroker};
use uuid_generator::{GeneratorConfig, IdGenerator, SnowflakeGenerator};

use crate::error::ProducerError;
use crate::metrics::{
    MetricsSink, NoopSink, GENERATE_DURATION_SECONDS, PUBLISH_DURATION_SECONDS,
};
use crate::report::RunSummary;

/// Retry cap for one identifier slot when the random source fails. Past the
/// cap the slot is surfaced as a fatal result instead of retrying forever.
const MAX_GENERATE_RETRIES: u32 = 8;

/// Coordinates identifier generation and concurrent fan-out.
///
/// Fan-out policy: N workers, all brokers. The run's total is partitioned
/// across the workers; every worker publishes each identifier it consumes to
/// every connected broker, so all brokers receive the complete stream.
/// Brokers that failed to connect stay in the slot list as `None` and are
/// skipped during publish, not retried.
pub struct Producer {
    slots: Arc<Vec<Option<Arc<dyn Broker>>>>,
    generator: Arc<dyn IdGenerator>,
    workers: usize,
    sink: Arc<dyn MetricsSink>,
}

impl Producer {
    /// Attempt to connect to every address, keeping failed connects as
    /// absent slots (position preserved) rather than aborting the run.
    pub async fn connect(addresses: &[String], generator: GeneratorConfig, workers: usize) -> Self {
        let mut slots: Vec<Option<Arc<dyn Broker>>> = Vec::with_capacity(addresses.len());
        for addr in addresses {
            let mut broker = KafkaBroker::new(addr.clone());
            match broker.connect().await {
                Ok(()) => {
                    info!("connected to broker {addr}");
                    slots.push(Some(Arc::new(broker)));
                }
                Err(e) => {
                    warn!("skipping broker {addr}: {e}");
                    slots.push(None);
                }
            }
        }
        Self::from_parts(
            slots,
            Arc::new(SnowflakeGenerator::new(generator)),
            workers,
        )
    }

    /// Assemble a producer from already-built broker slots and a generator.
    pub fn from_parts(
        slots: Vec<Option<Arc<dyn Broker>>>,
        generator: Arc<dyn IdGenerator>,
        workers: usize,
    ) -> Self {
        Self {
            slots: Arc::new(slots),
            generator,
            workers: workers.max(1),
            sink: Arc::new(NoopSink),
        }
    }

    /// Replace the observability sink.
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Flush and close every connected broker. Close failures are logged
    /// and do not mask a successful run.
    pub async fn shutdown(&self) {
        for broker in self.slots.iter().flatten() {
            if let Err(e) = broker.close().await {
                warn!("error closing broker {}: {e}", broker.identity());
            }
        }
    }

    /// Identities of the brokers that connected successfully.
    pub fn connected_brokers(&self) -> Vec<&str> {
        self.slots
            .iter()
            .flatten()
            .map(|broker| broker.identity())
            .collect()
    }

    /// Publish `total` identifiers to `queue` across the worker pool.
    ///
    /// Returns the first publish or generation error observed while draining
    /// worker results; remaining workers finish asynchronously (no
    /// cancellation is propagated). On success, returns counts and timings
    /// for the whole run.
    pub async fn run(&self, queue: &str, total: u64) -> Result<RunSummary, ProducerError> {
        let started = Instant::now();
        let connected = self.slots.iter().flatten().count();
        let absent = self.slots.len() - connected;
        if connected == 0 {
            warn!("no connected brokers; identifiers will be generated but not published");
        }

        let shares = partition(total, self.workers);
        let dispatched: u64 = shares.iter().sum();

        info!(
            queue,
            total,
            workers = self.workers,
            connected,
            absent,
            "starting run"
        );

        // Every possible error message must fit so writers never block after
        // the drain loop has returned.
        let capacity = (dispatched as usize).saturating_mul(self.slots.len().max(1)).max(1);
        let (errors_tx, mut errors_rx) = mpsc::channel::<ProducerError>(capacity);
        let attempts = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(self.workers);
        for (worker_id, share) in shares.into_iter().enumerate() {
            // Private bounded channel sized to the worker's whole share, so
            // the feeder never blocks in steady state.
            let (ids_tx, ids_rx) = mpsc::channel::<String>(share.max(1) as usize);

            tokio::spawn(feed(
                worker_id,
                share,
                Arc::clone(&self.generator),
                ids_tx,
                errors_tx.clone(),
                Arc::clone(&self.sink),
            ));

            handles.push(tokio::spawn(publish_share(
                worker_id,
                Arc::clone(&self.slots),
                queue.to_string(),
                ids_rx,
                errors_tx.clone(),
                Arc::clone(&attempts),
                Arc::clone(&self.sink),
            )));
        }
        drop(errors_tx);

        // Supervisor: barrier on all workers. The error channel closes once
        // every feeder and worker has dropped its sender, which ends the
        // drain loop below.
        let supervisor = tokio::spawn(async move {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!("worker task failed to join: {e}");
                }
            }
            debug!("all workers finished");
        });

        // Drain: only failures are reported, so the first message received
        // is the run's error; a closed channel means a clean run.
        if let Some(error) = errors_rx.recv().await {
            // First failure wins; workers keep running to completion.
            return Err(error);
        }

        if let Err(e) = supervisor.await {
            warn!("supervisor task failed to join: {e}");
        }

        let summary = RunSummary {
            requested: total,
            dispatched,
            publish_attempts: attempts.load(Ordering::Relaxed),
            connected_brokers: connected,
            absent_brokers: absent,
            workers: self.workers,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!("{}", summary.summary_line());
        Ok(summary)
    }
}

/// Split `total` across `workers`, spreading the remainder one extra to the
/// first workers so the full count is dispatched.
fn partition(total: u64, workers: usize) -> Vec<u64> {
    let workers = workers.max(1);
    let base = total / workers as u64;
    let remainder = (total % workers as u64) as usize;
    (0..workers)
        .map(|i| base + u64::from(i < remainder))
        .collect()
}

/// Feeder: generates the worker's share of identifiers into its channel.
///
/// A generation failure retries the same slot up to [`MAX_GENERATE_RETRIES`]
/// times; past the cap the slot is reported as a fatal result and skipped.
async fn feed(
    worker_id: usize,
    share: u64,
    generator: Arc<dyn IdGenerator>,
    ids_tx: mpsc::Sender<String>,
    errors_tx: mpsc::Sender<ProducerError>,
    sink: Arc<dyn MetricsSink>,
) {
    let worker_label = format!("worker-{worker_id}");
    for _ in 0..share {
        let mut attempts = 0;
        loop {
            let start = Instant::now();
            match generator.generate(Utc::now()) {
                Ok(id) => {
                    sink.record(
                        GENERATE_DURATION_SECONDS,
                        &[("worker", worker_label.as_str())],
                        start.elapsed().as_secs_f64(),
                    );
                    if ids_tx.send(id).await.is_err() {
                        // Worker gone; nothing left to feed.
                        return;
                    }
                    break;
                }
                Err(e) => {
                    attempts += 1;
                    if attempts >= MAX_GENERATE_RETRIES {
                        warn!("worker {worker_id}: giving up on identifier after {attempts} attempts");
                        let _ = errors_tx
                            .send(ProducerError::Generate {
                                worker: worker_id,
                                attempts,
                                source: e,
                            })
                            .await;
                        break;
                    }
                    debug!("worker {worker_id}: retrying identifier generation: {e}");
                }
            }
        }
    }
}

/// Worker: drains its channel and publishes each identifier's UTF-8 bytes to
/// every connected broker. Publish failures are reported and do not stop the
/// worker; absent slots are skipped silently.
async fn publish_share(
    worker_id: usize,
    slots: Arc<Vec<Option<Arc<dyn Broker>>>>,
    queue: String,
    mut ids_rx: mpsc::Receiver<String>,
    errors_tx: mpsc::Sender<ProducerError>,
    attempts: Arc<AtomicU64>,
    sink: Arc<dyn MetricsSink>,
) {
    let worker_label = format!("worker-{worker_id}");
    while let Some(id) = ids_rx.recv().await {
        for slot in slots.iter() {
            let Some(broker) = slot else {
                continue;
            };
            attempts.fetch_add(1, Ordering::Relaxed);

            let start = Instant::now();
            let outcome = broker.publish(&queue, id.as_bytes()).await;
            sink.record(
                PUBLISH_DURATION_SECONDS,
                &[
                    ("worker", worker_label.as_str()),
                    ("broker", broker.identity()),
                ],
                start.elapsed().as_secs_f64(),
            );

            if let Err(e) = outcome {
                let wrapped = ProducerError::Publish {
                    worker: worker_id,
                    broker: broker.identity().to_string(),
                    source: e,
                };
                // A failed send means the drain loop already returned; keep
                // publishing the rest of the share regardless.
                let _ = errors_tx.send(wrapped).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use uuid_broker::BrokerError;
    use uuid_generator::GeneratorError;

    use super::*;

    struct MockBroker {
        name: String,
        published: AtomicUsize,
        closed: AtomicUsize,
        fail_from: Option<usize>,
    }

    impl MockBroker {
        fn ok(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                published: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                fail_from: None,
            })
        }

        fn failing_from(name: &str, nth: usize) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                published: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                fail_from: Some(nth),
            })
        }

        fn published(&self) -> usize {
            self.published.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Broker for MockBroker {
        async fn connect(&mut self) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn publish(&self, _queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
            assert_eq!(payload.len(), 128, "payload must be the hex identifier");
            let n = self.published.fetch_add(1, Ordering::SeqCst);
            if let Some(limit) = self.fail_from {
                if n >= limit {
                    return Err(BrokerError::NotConnected(self.name.clone()));
                }
            }
            Ok(())
        }

        async fn close(&self) -> Result<(), BrokerError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn identity(&self) -> &str {
            &self.name
        }
    }

    /// Generator failing a fixed number of times before succeeding forever.
    struct FlakyGenerator {
        inner: SnowflakeGenerator,
        failures_left: AtomicUsize,
    }

    impl FlakyGenerator {
        fn failing(times: usize) -> Arc<Self> {
            Arc::new(Self {
                inner: SnowflakeGenerator::new(GeneratorConfig {
                    use_buffer: false,
                    ..GeneratorConfig::default()
                }),
                failures_left: AtomicUsize::new(times),
            })
        }
    }

    impl IdGenerator for FlakyGenerator {
        fn generate(&self, now: DateTime<Utc>) -> Result<String, GeneratorError> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(GeneratorError::RandomSource("injected".to_string()));
            }
            self.inner.generate(now)
        }
    }

    fn default_generator() -> Arc<dyn IdGenerator> {
        Arc::new(SnowflakeGenerator::new(GeneratorConfig {
            use_buffer: false,
            ..GeneratorConfig::default()
        }))
    }

    #[test]
    fn partition_spreads_the_remainder_across_the_first_workers() {
        assert_eq!(partition(10, 3), vec![4, 3, 3]);
        assert_eq!(partition(9, 3), vec![3, 3, 3]);
        assert_eq!(partition(2, 5), vec![1, 1, 0, 0, 0]);
        assert_eq!(partition(0, 4), vec![0, 0, 0, 0]);
        assert_eq!(partition(7, 0), vec![7]);
    }

    #[tokio::test]
    async fn run_dispatches_the_full_count_to_every_broker() {
        let first = MockBroker::ok("kafka-1");
        let second = MockBroker::ok("kafka-2");
        let slots: Vec<Option<Arc<dyn Broker>>> =
            vec![Some(first.clone()), Some(second.clone())];

        let producer = Producer::from_parts(slots, default_generator(), 3);
        let summary = producer.run("uuids", 10).await.unwrap();

        assert_eq!(summary.dispatched, 10);
        assert_eq!(summary.publish_attempts, 20);
        assert_eq!(first.published(), 10);
        assert_eq!(second.published(), 10);
    }

    #[tokio::test]
    async fn absent_broker_slots_are_skipped_without_error() {
        let ok = MockBroker::ok("ok-broker");
        let slots: Vec<Option<Arc<dyn Broker>>> = vec![Some(ok.clone()), None];

        let producer = Producer::from_parts(slots, default_generator(), 2);
        let summary = producer.run("uuids", 10).await.unwrap();

        assert_eq!(summary.dispatched, 10);
        assert_eq!(summary.publish_attempts, 10);
        assert_eq!(summary.connected_brokers, 1);
        assert_eq!(summary.absent_brokers, 1);
        assert_eq!(ok.published(), 10);
    }

    #[tokio::test]
    async fn all_absent_brokers_still_complete_the_run() {
        let slots: Vec<Option<Arc<dyn Broker>>> = vec![None, None];
        let producer = Producer::from_parts(slots, default_generator(), 2);

        let summary = producer.run("uuids", 6).await.unwrap();
        assert_eq!(summary.dispatched, 6);
        assert_eq!(summary.publish_attempts, 0);
    }

    #[tokio::test]
    async fn first_publish_error_is_returned_with_broker_identity() {
        let flaky = MockBroker::failing_from("flaky-broker", 3);
        let slots: Vec<Option<Arc<dyn Broker>>> = vec![Some(flaky)];

        let producer = Producer::from_parts(slots, default_generator(), 2);
        let err = producer.run("uuids", 10).await.unwrap_err();

        match err {
            ProducerError::Publish { broker, .. } => assert_eq!(broker, "flaky-broker"),
            other => panic!("expected publish error, got {other}"),
        }
    }

    #[tokio::test]
    async fn transient_generation_failures_are_retried_in_place() {
        let ok = MockBroker::ok("kafka-1");
        let slots: Vec<Option<Arc<dyn Broker>>> = vec![Some(ok.clone())];

        // Fewer failures than the retry cap: every slot still gets filled.
        let producer = Producer::from_parts(slots, FlakyGenerator::failing(3), 1);
        let summary = producer.run("uuids", 5).await.unwrap();

        assert_eq!(summary.dispatched, 5);
        assert_eq!(ok.published(), 5);
    }

    #[tokio::test]
    async fn persistent_generation_failure_surfaces_after_the_retry_cap() {
        let slots: Vec<Option<Arc<dyn Broker>>> = vec![Some(MockBroker::ok("kafka-1"))];

        let producer = Producer::from_parts(slots, FlakyGenerator::failing(usize::MAX), 1);
        let err = producer.run("uuids", 3).await.unwrap_err();

        assert!(matches!(err, ProducerError::Generate { .. }));
    }

    #[tokio::test]
    async fn zero_total_is_a_successful_empty_run() {
        let ok = MockBroker::ok("kafka-1");
        let slots: Vec<Option<Arc<dyn Broker>>> = vec![Some(ok.clone())];

        let producer = Producer::from_parts(slots, default_generator(), 4);
        let summary = producer.run("uuids", 0).await.unwrap();

        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.publish_attempts, 0);
        assert_eq!(ok.published(), 0);
    }

    #[tokio::test]
    async fn shutdown_closes_every_connected_broker() {
        let first = MockBroker::ok("kafka-1");
        let second = MockBroker::ok("kafka-2");
        let slots: Vec<Option<Arc<dyn Broker>>> =
            vec![Some(first.clone()), None, Some(second.clone())];

        let producer = Producer::from_parts(slots, default_generator(), 2);
        producer.shutdown().await;

        assert_eq!(first.closed.load(Ordering::SeqCst), 1);
        assert_eq!(second.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connected_brokers_lists_only_live_handles() {
        let slots: Vec<Option<Arc<dyn Broker>>> =
            vec![Some(MockBroker::ok("kafka-1")), None, Some(MockBroker::ok("kafka-3"))];
        let producer = Producer::from_parts(slots, default_generator(), 1);
        assert_eq!(producer.connected_brokers(), vec!["kafka-1", "kafka-3"]);
    }
}
