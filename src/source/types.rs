/// Position on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelescopePosition {
    pub id: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteObservation {
    pub id: String,
    /// Meters above sea level.
    pub altitude: f64,
    pub coordinate: Coordinate,
}

/// One decoded poll result from a telescope channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub time: f64,
    pub telescope: TelescopePosition,
    pub satellites: Vec<SatelliteObservation>,
}
