use crate::source::{Coordinate, Snapshot};

/// A single satellite sighting, tagged with the telescope and poll time.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub time: f64,
    pub telescope_id: String,
    pub satellite_id: String,
    pub altitude: f64,
    pub coordinate: Coordinate,
}

/// Expand a snapshot into one measurement per observed satellite, in
/// observation order.
pub fn flatten(snapshot: &Snapshot) -> Vec<Measurement> {
    snapshot
        .satellites
        .iter()
        .map(|sat| Measurement {
            time: snapshot.time,
            telescope_id: snapshot.telescope.id.clone(),
            satellite_id: sat.id.clone(),
            altitude: sat.altitude,
            coordinate: sat.coordinate,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SatelliteObservation, TelescopePosition};

    fn snapshot(satellites: usize) -> Snapshot {
        Snapshot {
            time: 42.5,
            telescope: TelescopePosition {
                id: "tel_a".into(),
                coordinate: Coordinate {
                    latitude: 1.0,
                    longitude: 2.0,
                },
            },
            satellites: (0..satellites)
                .map(|i| SatelliteObservation {
                    id: format!("sat_{}", i),
                    altitude: 1000.0 * i as f64,
                    coordinate: Coordinate {
                        latitude: i as f64,
                        longitude: -(i as f64),
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn one_measurement_per_satellite_in_order() {
        for k in [1, 2, 7] {
            let measurements = flatten(&snapshot(k));
            assert_eq!(measurements.len(), k);
            for (i, m) in measurements.iter().enumerate() {
                assert_eq!(m.time, 42.5);
                assert_eq!(m.telescope_id, "tel_a");
                assert_eq!(m.satellite_id, format!("sat_{}", i));
                assert_eq!(m.altitude, 1000.0 * i as f64);
                assert_eq!(m.coordinate.longitude, -(i as f64));
            }
        }
    }

    #[test]
    fn empty_snapshot_yields_nothing() {
        assert!(flatten(&snapshot(0)).is_empty());
    }
}
