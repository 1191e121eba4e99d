mod broadcast;
pub mod bucket;
mod crash;
mod error;
mod flatten;
mod merge;
mod runner;
mod stats;
#[cfg(test)]
pub(crate) mod testing;

pub use broadcast::{Ack, Envelope, SyncBroadcast};
pub use bucket::{bucket_keys, round_to_nearest_multiple, BucketKey};
pub use crash::{detect, CrashAlert, ATMOSPHERIC_HEIGHT};
pub use error::PipelineError;
pub use flatten::{flatten, Measurement};
pub use merge::merge;
pub use runner::Pipeline;
pub use stats::{PipelineStats, StatsSnapshot};
