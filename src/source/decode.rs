use serde_json::{Map, Value};

use super::error::DecodeError;
use super::types::{Coordinate, SatelliteObservation, Snapshot, TelescopePosition};

/// Parse a telescope response body into a [`Snapshot`].
///
/// Coordinates are accepted either flat on the object (`latitude`,
/// `longitude`) or nested under `coordinate`.
pub fn decode_snapshot(body: &str) -> Result<Snapshot, DecodeError> {
    let root: Value = serde_json::from_str(body)?;
    let root = as_object(&root, "$")?;

    let time = number(root, "$", "time")?;

    let telescope = object(root, "$", "telescope")?;
    let telescope = TelescopePosition {
        id: string(telescope, "telescope", "id")?,
        coordinate: coordinate(telescope, "telescope")?,
    };

    let satellites = required(root, "$", "satellites")?
        .as_array()
        .ok_or_else(|| wrong_type("satellites", "an array"))?
        .iter()
        .enumerate()
        .map(|(i, v)| satellite(i, v))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Snapshot {
        time,
        telescope,
        satellites,
    })
}

fn satellite(i: usize, value: &Value) -> Result<SatelliteObservation, DecodeError> {
    let path = format!("satellites[{}]", i);
    let map = as_object(value, &path)?;
    Ok(SatelliteObservation {
        id: string(map, &path, "id")?,
        altitude: number(map, &path, "altitude")?,
        coordinate: coordinate(map, &path)?,
    })
}

fn coordinate(map: &Map<String, Value>, path: &str) -> Result<Coordinate, DecodeError> {
    match map.get("coordinate") {
        Some(nested) => {
            let nested_path = join(path, "coordinate");
            let nested = as_object(nested, &nested_path)?;
            Ok(Coordinate {
                latitude: number(nested, &nested_path, "latitude")?,
                longitude: number(nested, &nested_path, "longitude")?,
            })
        }
        None => Ok(Coordinate {
            latitude: number(map, path, "latitude")?,
            longitude: number(map, path, "longitude")?,
        }),
    }
}

fn required<'a>(
    map: &'a Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a Value, DecodeError> {
    map.get(key)
        .ok_or_else(|| DecodeError::MissingField(join(path, key)))
}

fn object<'a>(
    map: &'a Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a Map<String, Value>, DecodeError> {
    as_object(required(map, path, key)?, &join(path, key))
}

fn number(map: &Map<String, Value>, path: &str, key: &str) -> Result<f64, DecodeError> {
    required(map, path, key)?
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| wrong_type(&join(path, key), "a finite number"))
}

fn string(map: &Map<String, Value>, path: &str, key: &str) -> Result<String, DecodeError> {
    required(map, path, key)?
        .as_str()
        .map(String::from)
        .ok_or_else(|| wrong_type(&join(path, key), "a string"))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, DecodeError> {
    value.as_object().ok_or_else(|| wrong_type(path, "an object"))
}

fn wrong_type(field: &str, expected: &'static str) -> DecodeError {
    DecodeError::WrongType {
        field: field.to_string(),
        expected,
    }
}

fn join(path: &str, key: &str) -> String {
    if path == "$" {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}
