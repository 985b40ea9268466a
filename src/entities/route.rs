use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Coordinates;

/// Immutable reference data describing a trotro line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub pickup: String,
    pub destination: String,
    pub distance: f64,
    pub base_fare: f64,
    pub stops: Vec<String>,
    pub waypoints: Vec<Waypoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
    pub stop_name: String,
}

impl Waypoint {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

impl Route {
    pub fn new(
        name: impl Into<String>,
        distance: f64,
        base_fare: f64,
        waypoints: Vec<Waypoint>,
    ) -> Self {
        let stops: Vec<String> = waypoints.iter().map(|w| w.stop_name.clone()).collect();

        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            pickup: stops.first().cloned().unwrap_or_default(),
            destination: stops.last().cloned().unwrap_or_default(),
            distance,
            base_fare,
            stops,
            waypoints,
        }
    }

    /// True when the route serves `pickup` strictly before `destination`.
    ///
    /// Names compare case-insensitively. Routes without a stop list fall
    /// back to their pickup/destination fields.
    pub fn serves(&self, pickup: &str, destination: &str) -> bool {
        let pickup = pickup.to_lowercase();
        let destination = destination.to_lowercase();

        if self.stops.is_empty() {
            return self.pickup.to_lowercase() == pickup
                && self.destination.to_lowercase() == destination;
        }

        let position = |name: &str| self.stops.iter().position(|s| s.to_lowercase() == name);

        match (position(&pickup), position(&destination)) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    pub fn first_waypoint(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    /// Exact stop-name lookup, falling back to the first waypoint.
    pub fn pickup_waypoint(&self, stop_name: &str) -> Option<&Waypoint> {
        self.find_waypoint(stop_name).or_else(|| self.waypoints.first())
    }

    /// Exact stop-name lookup, falling back to the last waypoint.
    pub fn dropoff_waypoint(&self, stop_name: &str) -> Option<&Waypoint> {
        self.find_waypoint(stop_name).or_else(|| self.waypoints.last())
    }

    fn find_waypoint(&self, stop_name: &str) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.stop_name == stop_name)
    }
}

#[cfg(test)]
pub(crate) fn circle_madina() -> Route {
    let waypoint = |lat, lng, name: &str| Waypoint {
        lat,
        lng,
        stop_name: name.into(),
    };

    Route::new(
        "Circle → Madina",
        12.4,
        3.5,
        vec![
            waypoint(5.5600, -0.1969, "Circle"),
            waypoint(5.6108, -0.1850, "37 Military Hospital"),
            waypoint(5.6506, -0.1867, "Legon"),
            waypoint(5.6718, -0.1745, "Atomic Junction"),
            waypoint(5.6806, -0.1686, "Madina"),
        ],
    )
}

#[test]
fn serves_stops_in_travel_order_only() {
    let route = circle_madina();

    assert!(route.serves("Circle", "Madina"));
    assert!(route.serves("circle", "LEGON"));
    assert!(route.serves("Legon", "Atomic Junction"));
    assert!(!route.serves("Madina", "Circle"));
    assert!(!route.serves("Circle", "Circle"));
    assert!(!route.serves("Circle", "Kaneshie"));
}

#[test]
fn routes_without_stops_match_on_endpoints() {
    let mut route = circle_madina();
    route.stops.clear();

    assert!(route.serves("circle", "madina"));
    assert!(!route.serves("Circle", "Legon"));
}

#[test]
fn stop_names_fold_case_beyond_ascii() {
    let mut route = circle_madina();
    route.stops = vec!["École Nord".into(), "Ñkwanta".into()];

    assert!(route.serves("ÉCOLE NORD", "ñKWANTA"));
    assert!(!route.serves("Ñkwanta", "école nord"));
}

#[test]
fn waypoint_lookup_falls_back_to_route_ends() {
    let route = circle_madina();

    assert_eq!(route.pickup_waypoint("Legon").unwrap().stop_name, "Legon");
    assert_eq!(route.pickup_waypoint("Nowhere").unwrap().stop_name, "Circle");
    assert_eq!(route.dropoff_waypoint("Nowhere").unwrap().stop_name, "Madina");
    // lookup is exact, unlike search
    assert_eq!(route.dropoff_waypoint("legon").unwrap().stop_name, "Madina");
}
