//! # splitwire
//!
//! Delegates input split generation to an external worker process.
//!
//! A coordinator asks a worker how a file should be divided into partitions
//! for parallel processing. The worker answers with a list of byte ranges,
//! each with the hosts that hold the data locally.
//!
//! ## Architecture
//!
//! - **Control Plane** (stdio): one JSON `$ready` line announcing the pipe
//! - **Data Plane** (named pipe): tagged big-endian values in strict order
//!
//! ## Example
//!
//! ```ignore
//! use splitwire::{ProcessConnector, SplitGenerator, SplitSource};
//!
//! #[tokio::main]
//! async fn main() -> splitwire::Result<()> {
//!     let generator = SplitGenerator::new(ProcessConnector::new("./split-worker"));
//!     let source = SplitSource::new(1, "/data/input.csv", r".*\.csv", "");
//!
//!     for split in generator.create_input_splits(&source, 4).await? {
//!         println!("{} {}..={} {:?}", split.path(), split.from(), split.to(), split.hosts());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod filter;
pub mod generator;
pub mod protocol;
pub mod request;
pub mod source;
pub mod split;
pub mod transport;
pub mod worker;

pub use config::SplitConfig;
pub use error::{Result, SplitError};
pub use filter::{matches_file_name, FileFilter};
pub use generator::SplitGenerator;
pub use protocol::Value;
pub use request::{SessionIds, SplitRequest};
pub use source::SplitSource;
pub use split::PartitionDescriptor;
pub use transport::{PipeConnector, ProcessConnector, Session, SessionInfo, WorkerConnector};
