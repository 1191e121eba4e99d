use super::flatten::Measurement;
use crate::source::Coordinate;

/// Altitude in meters below which a satellite is considered to be
/// re-entering the atmosphere.
pub const ATMOSPHERIC_HEIGHT: f64 = 12_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CrashAlert {
    pub satellite_id: String,
    pub coordinate: Coordinate,
}

pub fn detect(measurement: &Measurement) -> Option<CrashAlert> {
    (measurement.altitude < ATMOSPHERIC_HEIGHT).then(|| CrashAlert {
        satellite_id: measurement.satellite_id.clone(),
        coordinate: measurement.coordinate,
    })
}
