//! CLI arguments and brokers-file loading.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::ProducerError;

/// Produce unique identifiers and publish them to message brokers.
#[derive(Parser, Clone, Debug)]
#[command(name = "uuid-producer", version, about)]
pub struct Args {
    /// File containing broker addresses, one per line
    #[arg(long, short = 'f', env = "UUID_BROKERS_FILE", default_value = "brokers.txt")]
    pub brokers_file: PathBuf,

    /// Total number of identifiers to generate and publish
    #[arg(long, short = 'n', default_value = "1000000")]
    pub count: u64,

    /// Worker count (defaults to the number of configured brokers)
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Queue every message is published to
    #[arg(long, short = 'q', default_value = "uuids")]
    pub queue: String,

    /// Numeric id baked into every identifier from this process
    #[arg(long, default_value = "1")]
    pub generator_id: i64,

    /// Disable the random component of generated identifiers
    #[arg(long)]
    pub no_random: bool,

    /// Disable the background random-value buffer
    #[arg(long)]
    pub no_buffer: bool,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    pub summary_output: Option<PathBuf>,
}

/// Load broker addresses from a text file, one per line.
///
/// Lines are trimmed of surrounding whitespace and blank lines are skipped;
/// order is preserved. An empty list is a configuration error.
pub fn load_brokers_file(path: &Path) -> Result<Vec<String>, ProducerError> {
    let contents = std::fs::read_to_string(path)?;
    let brokers: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if brokers.is_empty() {
        return Err(ProducerError::Config(format!(
            "no broker addresses found in {}",
            path.display()
        )));
    }
    Ok(brokers)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn brokers_file_is_trimmed_and_order_preserving() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  kafka-1:9092  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "kafka-2:9092").unwrap();
        writeln!(file, "\tkafka-3:9092").unwrap();

        let brokers = load_brokers_file(file.path()).unwrap();
        assert_eq!(brokers, vec!["kafka-1:9092", "kafka-2:9092", "kafka-3:9092"]);
    }

    #[test]
    fn empty_brokers_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();

        let err = load_brokers_file(file.path()).unwrap_err();
        assert!(matches!(err, ProducerError::Config(_)));
    }

    #[test]
    fn missing_brokers_file_is_an_io_error() {
        let err = load_brokers_file(Path::new("/nonexistent/brokers.txt")).unwrap_err();
        assert!(matches!(err, ProducerError::Io(_)));
    }
}
