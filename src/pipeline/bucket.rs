//! Overlapping spatio-temporal buckets for collision candidate grouping.
//!
//! Every measurement is replicated into three half-window-shifted bins per
//! dimension, so two measurements closer than half a window in all four
//! dimensions always share at least one bucket file.

use super::flatten::Measurement;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub size: f64,
    pub unit: &'static str,
}

pub const TIME_WINDOW: Window = Window {
    size: 60.0,
    unit: "s",
};

pub const LATITUDE_WINDOW: Window = Window {
    size: 1.0,
    unit: "deg",
};

pub const LONGITUDE_WINDOW: Window = Window {
    size: 1.0,
    unit: "deg",
};

pub const ALTITUDE_WINDOW: Window = Window {
    size: 100.0,
    unit: "m",
};

/// Number of buckets every measurement lands in.
pub const BUCKETS_PER_MEASUREMENT: usize = 81;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub time_range: String,
    pub latitude_range: String,
    pub longitude_range: String,
    pub altitude_range: String,
}

impl BucketKey {
    /// Path of the bucket file, relative to the results root.
    pub fn file_name(&self) -> String {
        format!(
            "collisions/{}_{}_{}_{}.csv",
            self.time_range, self.latitude_range, self.longitude_range, self.altitude_range
        )
    }
}

/// Round half away from zero to the nearest multiple of `multiple`.
pub fn round_to_nearest_multiple(value: f64, multiple: f64) -> f64 {
    (value / multiple).round() * multiple
}

/// The three overlapping range labels `value` falls into.
///
/// Centres sit at `core - w/2`, `core` and `core + w/2` where `core` is the
/// nearest multiple of the window size. Centres are kept exact rather than
/// truncated to integers; truncating would fold the half-degree centres onto
/// their neighbours.
pub fn range_labels(value: f64, window: Window) -> [String; 3] {
    let core = round_to_nearest_multiple(value, window.size);
    let half = window.size / 2.0;
    [core - half, core, core + half].map(|centre| label(centre, half, window.unit))
}

fn label(centre: f64, half: f64, unit: &str) -> String {
    // -0.0 would otherwise print as "-0.0"
    let lo = centre - half + 0.0;
    let hi = centre + half + 0.0;
    format!("{:.1}{}-{:.1}{}", lo, unit, hi, unit)
}

/// Cross product of the per-dimension labels: always 81 distinct keys.
pub fn bucket_keys(measurement: &Measurement) -> Vec<BucketKey> {
    let times = range_labels(measurement.time, TIME_WINDOW);
    let latitudes = range_labels(measurement.coordinate.latitude, LATITUDE_WINDOW);
    let longitudes = range_labels(measurement.coordinate.longitude, LONGITUDE_WINDOW);
    let altitudes = range_labels(measurement.altitude, ALTITUDE_WINDOW);

    let mut keys = Vec::with_capacity(BUCKETS_PER_MEASUREMENT);
    for time in &times {
        for latitude in &latitudes {
            for longitude in &longitudes {
                for altitude in &altitudes {
                    keys.push(BucketKey {
                        time_range: time.clone(),
                        latitude_range: latitude.clone(),
                        longitude_range: longitude.clone(),
                        altitude_range: altitude.clone(),
                    });
                }
            }
        }
    }
    keys
}
