//! Split worker: divides a file into equal byte ranges.
//!
//! Launched by a coordinator with `SPLITWIRE_STAGING_DIR` and
//! `SPLITWIRE_SESSION_ID` set. Logs go to stderr; stdout is reserved for
//! the `$ready` line.
//!
//! The worker args payload may carry a host list: `hosts=h1,h2`.

use splitwire::worker::{self, SplitQuery};
use splitwire::{PartitionDescriptor, SessionInfo};
use tracing_subscriber::EnvFilter;

fn equal_ranges(info: &SessionInfo, query: SplitQuery) -> splitwire::Result<Vec<PartitionDescriptor>> {
    let len = std::fs::metadata(&query.path)?.len();
    if len == 0 {
        return Ok(Vec::new());
    }

    let hosts: Vec<String> = info
        .worker_args
        .split_whitespace()
        .find_map(|arg| arg.strip_prefix("hosts="))
        .map(|list| list.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    let count = u64::from(query.min_splits).clamp(1, len);
    let chunk = len.div_ceil(count);

    Ok((0..count)
        .map(|i| i * chunk)
        .take_while(|&from| from < len)
        .enumerate()
        .map(|(index, from)| {
            let to = (from + chunk).min(len) - 1;
            PartitionDescriptor::new(index, query.path.clone(), from, to, hosts.clone())
        })
        .collect())
}

#[tokio::main]
async fn main() -> splitwire::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let info = worker::run(equal_ranges).await?;
    tracing::info!("Session {} done", info.session_id);
    Ok(())
}
