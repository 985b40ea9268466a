use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Route, Vehicle};
use crate::error::{invalid_state_error, Error};

/// A vehicle's operating window, owned by one driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub trip_id: String,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub route_id: Uuid,
    pub route_name: String,
    pub available_seats: i32,
    pub capacity: i32,
    pub fare: f64,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Completed,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Active => "active".into(),
            Self::Completed => "completed".into(),
        }
    }
}

impl Trip {
    /// Snapshot of `vehicle` and `route` taken when the trip starts.
    pub fn new(trip_id: String, vehicle: &Vehicle, route: &Route) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            driver_id: vehicle.driver_id,
            vehicle_id: vehicle.vehicle_id,
            route_id: route.id,
            route_name: route.name.clone(),
            available_seats: vehicle.available_seats,
            capacity: vehicle.capacity,
            fare: vehicle.fare,
            status: Status::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    #[tracing::instrument(skip(self), fields(trip_id = %self.trip_id))]
    pub fn complete(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Active => {
                self.status = Status::Completed;
                Ok(())
            }
            Status::Completed => Err(invalid_state_error()),
        }
    }
}

pub fn trip_code(sequence: i64) -> String {
    format!("TR-{:06}", sequence)
}

#[test]
fn trip_completes_once() {
    use crate::entities::route::circle_madina;

    let route = circle_madina();
    let vehicle = Vehicle::new(Uuid::new_v4(), &route, 10);
    let mut trip = Trip::new(trip_code(7), &vehicle, &route);

    assert_eq!(trip.trip_id, "TR-000007");
    assert_eq!(trip.vehicle_id, vehicle.vehicle_id);
    assert_eq!(trip.available_seats, 10);
    assert!(trip.is_active());

    trip.complete().unwrap();
    assert_eq!(trip.status, Status::Completed);
    assert!(trip.complete().is_err());
}
