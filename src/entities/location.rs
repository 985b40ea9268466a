use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{invalid_field_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Accra city centre, used when a route carries no waypoints.
    pub const DEFAULT: Coordinates = Coordinates {
        lat: 5.6037,
        lng: -0.1870,
    };

    pub fn validate(&self) -> Result<(), Error> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(invalid_field_error("lat"));
        }

        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(invalid_field_error("lng"));
        }

        Ok(())
    }
}

/// Last known position of a vehicle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub last_updated: DateTime<Utc>,
}

impl Location {
    pub fn now(coordinates: Coordinates) -> Self {
        Self {
            lat: coordinates.lat,
            lng: coordinates.lng,
            last_updated: Utc::now(),
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[test]
fn coordinates_outside_the_globe_are_rejected() {
    assert!(Coordinates { lat: 5.6, lng: -0.18 }.validate().is_ok());
    assert!(Coordinates { lat: 91.0, lng: 0.0 }.validate().is_err());
    assert!(Coordinates { lat: 0.0, lng: -180.5 }.validate().is_err());
    assert!(Coordinates { lat: f64::NAN, lng: 0.0 }.validate().is_err());
}
