//! Coordinator CLI: asks a worker executable for the splits of a file.
//!
//! Usage: `generate_splits <worker> <path> [min_splits] [worker_args]`
//!
//! Try it with the bundled worker:
//!
//! ```text
//! cargo build --example split_worker
//! cargo run --example generate_splits -- target/debug/examples/split_worker Cargo.toml 3
//! ```

use splitwire::{ProcessConnector, SplitConfig, SplitError, SplitGenerator, SplitSource};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> splitwire::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(worker), Some(path)) = (args.next(), args.next()) else {
        return Err(SplitError::InvalidRequest(
            "usage: generate_splits <worker> <path> [min_splits] [worker_args]".to_string(),
        ));
    };
    let min_splits = match args.next() {
        Some(n) => n
            .parse::<u32>()
            .map_err(|e| SplitError::InvalidRequest(format!("bad min_splits {}: {}", n, e)))?,
        None => 2,
    };
    let worker_args = args.next().unwrap_or_default();

    let generator =
        SplitGenerator::with_config(ProcessConnector::new(worker), SplitConfig::from_env());
    let source = SplitSource::new(1, path, ".*", worker_args);

    for split in generator.create_input_splits(&source, min_splits).await? {
        println!(
            "#{} {} [{}..={}] span={} hosts={:?}",
            split.index(),
            split.path(),
            split.from(),
            split.to(),
            split.byte_len(),
            split.hosts()
        );
    }
    Ok(())
}
