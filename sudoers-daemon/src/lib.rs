//! Intent consumer: store watcher + serialized pass processor.

mod error;
pub mod paths;
mod runtime;

pub use error::DaemonError;
pub use runtime::{run, start_blocking, DaemonOptions, PassSummary};
