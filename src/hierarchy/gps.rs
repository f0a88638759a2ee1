use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// A site location.
///
/// Each coordinate takes any float literal `f64::from_str` accepts, such as
/// `+1.5`, `.5` or `1e1`. NaN and infinities fail the range check.
///
/// Read from either the PostgreSQL point text form `"(lat,lng)"` or an
/// object with `latitude`/`longitude` (`lat`/`lng` accepted). Always
/// written back as an object.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude {} out of range -90..=90", latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("longitude {} out of range -180..=180", longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

fn point_regex() -> &'static Regex {
    static POINT: OnceLock<Regex> = OnceLock::new();
    POINT.get_or_init(|| {
        Regex::new(r"^\(\s*([^,\s()]+)\s*,\s*([^,\s()]+)\s*\)$")
            .expect("point pattern is valid")
    })
}

impl FromStr for GpsPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = point_regex()
            .captures(s.trim())
            .ok_or_else(|| format!("'{}' is not a point of the form (lat,lng)", s))?;
        let latitude = captures[1]
            .parse::<f64>()
            .map_err(|e| format!("invalid latitude in '{}': {}", s, e))?;
        let longitude = captures[2]
            .parse::<f64>()
            .map_err(|e| format!("invalid longitude in '{}': {}", s, e))?;
        GpsPoint::new(latitude, longitude)
    }
}

impl fmt::Display for GpsPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.latitude, self.longitude)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Text(String),
    Object {
        #[serde(alias = "lat")]
        latitude: f64,
        #[serde(alias = "lng", alias = "lon")]
        longitude: f64,
    },
}

impl<'de> Deserialize<'de> for GpsPoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawPoint::deserialize(deserializer)? {
            RawPoint::Text(text) => text.parse().map_err(de::Error::custom),
            RawPoint::Object {
                latitude,
                longitude,
            } => GpsPoint::new(latitude, longitude).map_err(de::Error::custom),
        }
    }
}
