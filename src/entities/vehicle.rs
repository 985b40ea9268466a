use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Coordinates, Location, Route};
use crate::error::{no_seats_available_error, vehicle_inactive_error, Error};

/// Fixed number of seats in a trotro.
pub const VEHICLE_CAPACITY: i32 = 14;

/// One physical vehicle for the duration of a trip window.
///
/// `vehicle_id` is the stable key used by trips, bookings and broadcast
/// channels; `id` is only the storage row id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub route_id: Uuid,
    pub status: Status,
    pub capacity: i32,
    pub available_seats: i32,
    pub fare: f64,
    pub battery_level: i32,
    pub license_plate: String,
    pub location: Location,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Inactive,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Active => "active".into(),
            Self::Inactive => "inactive".into(),
        }
    }
}

/// Seat assigned to the booking that observed `available_before` free seats.
///
/// Seats are handed out in booking order and are never returned to the
/// ledger, so the number only depends on how many seats are already gone.
pub fn seat_number(capacity: i32, available_before: i32) -> i32 {
    capacity.min(capacity - available_before + 1)
}

impl Vehicle {
    /// Vehicle for a trip that is starting now on `route`.
    ///
    /// `requested_seats` is taken as-is, even above [`VEHICLE_CAPACITY`].
    pub fn new(driver_id: Uuid, route: &Route, requested_seats: i32) -> Self {
        let mut rng = rand::thread_rng();

        let start = route
            .first_waypoint()
            .map(|w| w.coordinates())
            .unwrap_or(Coordinates::DEFAULT);

        Self {
            id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            driver_id,
            route_id: route.id,
            status: Status::Active,
            capacity: VEHICLE_CAPACITY,
            available_seats: requested_seats,
            fare: route.base_fare,
            battery_level: rng.gen_range(60..95),
            license_plate: format!("GT-{}-24", rng.gen_range(1000..10000)),
            location: Location::now(start),
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Takes one seat off the ledger.
    pub fn take_seat(&mut self) -> Result<(), Error> {
        if !self.is_active() {
            return Err(vehicle_inactive_error());
        }

        if self.available_seats <= 0 {
            return Err(no_seats_available_error());
        }

        self.available_seats -= 1;

        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.status = Status::Inactive;
    }

    /// Share of seats taken, in percent. `None` for zero-capacity vehicles.
    pub fn occupancy(&self) -> Option<f64> {
        if self.capacity <= 0 {
            return None;
        }

        Some(f64::from(self.capacity - self.available_seats) / f64::from(self.capacity) * 100.0)
    }
}

#[test]
fn seat_numbers_follow_booking_order() {
    assert_eq!(seat_number(14, 14), 1);
    assert_eq!(seat_number(14, 10), 5);
    assert_eq!(seat_number(14, 1), 14);
    assert_eq!(seat_number(2, 2), 1);
    assert_eq!(seat_number(2, 1), 2);
}

#[test]
fn new_vehicle_starts_at_first_waypoint() {
    use crate::entities::route::circle_madina;

    let route = circle_madina();
    let vehicle = Vehicle::new(Uuid::new_v4(), &route, 20);

    assert!(vehicle.is_active());
    assert_eq!(vehicle.capacity, VEHICLE_CAPACITY);
    // over-capacity requests are kept as observed
    assert_eq!(vehicle.available_seats, 20);
    assert_eq!(vehicle.fare, 3.5);
    assert_eq!(vehicle.location.coordinates(), route.waypoints[0].coordinates());
    assert!((60..95).contains(&vehicle.battery_level));
    assert!(vehicle.license_plate.starts_with("GT-"));
    assert_ne!(vehicle.vehicle_id, vehicle.id);
}

#[test]
fn take_seat_stops_at_zero() {
    use crate::entities::route::circle_madina;

    let mut vehicle = Vehicle::new(Uuid::new_v4(), &circle_madina(), 1);

    vehicle.take_seat().unwrap();
    assert_eq!(vehicle.available_seats, 0);
    assert_eq!(vehicle.take_seat().unwrap_err().code, 300);
    assert_eq!(vehicle.available_seats, 0);

    vehicle.deactivate();
    assert_eq!(vehicle.take_seat().unwrap_err().code, 301);
}
