mod decode;
mod error;
mod poller;
mod types;

pub use decode::decode_snapshot;
pub use error::{DecodeError, PollError};
pub use poller::{PollSchedule, Poller};
pub use types::{Coordinate, SatelliteObservation, Snapshot, TelescopePosition};
