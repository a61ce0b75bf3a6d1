//! Command-line entry point for uuid-producer.
//!
//! # Usage Examples
//!
//! ```bash
//! # Publish one million identifiers to the "uuids" queue on every broker
//! # listed in brokers.txt, one worker per broker
//! uuid-producer --brokers-file brokers.txt --count 1000000
//!
//! # Smaller seeding run with an explicit worker pool and summary report
//! uuid-producer -f brokers.txt -n 10000 -w 8 -q seed-ids \
//!   --summary-output run-summary.json
//!
//! # Deterministic-ish debug run: no random component, no refill buffer
//! uuid-producer -f brokers.txt -n 100 --no-random --no-buffer
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use uuid_generator::GeneratorConfig;
use uuid_producer::config::{load_brokers_file, Args};
use uuid_producer::metrics::TracingSink;
use uuid_producer::producer::Producer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let addresses = load_brokers_file(&args.brokers_file).with_context(|| {
        format!(
            "failed to load broker addresses from {}",
            args.brokers_file.display()
        )
    })?;
    let workers = args.workers.unwrap_or(addresses.len()).max(1);

    let generator = GeneratorConfig {
        id: args.generator_id,
        use_random: !args.no_random,
        use_buffer: !args.no_buffer,
        ..GeneratorConfig::default()
    };

    let producer = Producer::connect(&addresses, generator, workers)
        .await
        .with_sink(Arc::new(TracingSink));

    let outcome = producer.run(&args.queue, args.count).await;
    producer.shutdown().await;
    let summary = outcome.context("generation process failed")?;

    if let Some(path) = &args.summary_output {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        info!("run summary written to {}", path.display());
    }

    info!("generation process completed successfully");
    Ok(())
}
