mod error;
mod writer;

use std::path::PathBuf;

use crate::pipeline::{bucket_keys, CrashAlert, Measurement};

pub use error::SinkError;
pub use writer::AppendWriter;

pub const RAW_FILE: &str = "raw_measurements.csv";
pub const CRASH_FILE: &str = "crashes.csv";

/// `telescope_id, satellite_id, altitude, latitude, longitude`
pub fn raw_line(m: &Measurement) -> String {
    format!(
        "{}, {}, {}, {}, {}",
        m.telescope_id, m.satellite_id, m.altitude, m.coordinate.latitude, m.coordinate.longitude
    )
}

/// `satellite_id, latitude, longitude`
pub fn crash_line(alert: &CrashAlert) -> String {
    format!(
        "{}, {}, {}",
        alert.satellite_id, alert.coordinate.latitude, alert.coordinate.longitude
    )
}

/// `satellite_id, altitude, latitude, longitude`
pub fn collision_line(m: &Measurement) -> String {
    format!(
        "{}, {}, {}, {}",
        m.satellite_id, m.altitude, m.coordinate.latitude, m.coordinate.longitude
    )
}

pub struct RawSink {
    writer: AppendWriter,
}

impl RawSink {
    pub fn new(writer: AppendWriter) -> Self {
        Self { writer }
    }

    pub async fn append(&self, measurement: &Measurement) -> Result<(), SinkError> {
        self.writer.append(RAW_FILE, raw_line(measurement)).await
    }
}

pub struct CrashSink {
    writer: AppendWriter,
}

impl CrashSink {
    pub fn new(writer: AppendWriter) -> Self {
        Self { writer }
    }

    pub async fn append(&self, alert: &CrashAlert) -> Result<(), SinkError> {
        self.writer.append(CRASH_FILE, crash_line(alert)).await
    }
}

/// Outcome of replicating one measurement into its bucket files.
#[derive(Debug, Default)]
pub struct CollisionWrite {
    pub written: usize,
    pub errors: Vec<SinkError>,
}

pub struct CollisionSink {
    writer: AppendWriter,
}

impl CollisionSink {
    pub fn new(writer: AppendWriter) -> Self {
        Self { writer }
    }

    /// Append the measurement to every bucket file it belongs to. A failure
    /// on one bucket does not stop the others.
    pub async fn append(&self, measurement: &Measurement) -> CollisionWrite {
        let line = collision_line(measurement);
        let lines = bucket_keys(measurement)
            .iter()
            .map(|key| (PathBuf::from(key.file_name()), line.clone()))
            .collect();

        let mut outcome = CollisionWrite::default();
        for result in self.writer.append_many(lines).await {
            match result {
                Ok(()) => outcome.written += 1,
                Err(e) => outcome.errors.push(e),
            }
        }
        outcome
    }
}
