//! Response shapes returned by the engine and serialized as-is by the server.

use serde::Serialize;
use uuid::Uuid;

use crate::entities::{
    Booking, Coordinates, Location, Route, Trip, TripStatus, Vehicle, VehicleStatus, Waypoint,
};

pub const UNKNOWN_DRIVER: &str = "Unknown Driver";
pub const UNKNOWN_PHONE: &str = "N/A";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStarted {
    pub vehicle_id: Uuid,
    pub trip_id: String,
    /// Route name.
    pub route: String,
    pub trip: Trip,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStopped {
    pub trip_id: String,
    pub vehicle_id: Uuid,
    pub cancelled_bookings: u64,
}

/// A driver's active trip with the live vehicle figures laid over the
/// snapshot taken at trip start.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTrip {
    pub id: Uuid,
    pub trip_id: String,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub route_id: Uuid,
    pub route_name: String,
    pub available_seats: i32,
    pub capacity: i32,
    pub fare: f64,
    pub status: TripStatus,
    pub location: Option<Location>,
    pub waypoints: Vec<Waypoint>,
}

impl ActiveTrip {
    pub fn new(trip: Trip, vehicle: Option<Vehicle>, route: Option<Route>) -> Self {
        let (available_seats, capacity, fare, location) = match vehicle {
            Some(v) => (v.available_seats, v.capacity, v.fare, Some(v.location)),
            None => (trip.available_seats, trip.capacity, trip.fare, None),
        };

        Self {
            id: trip.id,
            trip_id: trip.trip_id,
            driver_id: trip.driver_id,
            vehicle_id: trip.vehicle_id,
            route_id: trip.route_id,
            route_name: trip.route_name,
            available_seats,
            capacity,
            fare,
            status: trip.status,
            location,
            waypoints: route.map(|r| r.waypoints).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    pub vehicle_id: Uuid,
    pub route_id: Uuid,
    pub status: VehicleStatus,
    pub capacity: i32,
    pub available_seats: i32,
    pub fare: f64,
    pub battery_level: i32,
    pub license_plate: String,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
}

impl From<Vehicle> for VehicleSummary {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            vehicle_id: vehicle.vehicle_id,
            route_id: vehicle.route_id,
            status: vehicle.status,
            capacity: vehicle.capacity,
            available_seats: vehicle.available_seats,
            fare: vehicle.fare,
            battery_level: vehicle.battery_level,
            license_plate: vehicle.license_plate,
            location: vehicle.location,
            driver_name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMatch {
    #[serde(flatten)]
    pub route: Route,
    pub vehicles: Vec<VehicleSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLocation {
    pub vehicle: VehicleSummary,
    pub route: Option<Route>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking_id: String,
    pub fare: f64,
    pub seat_number: i32,
    pub booking: Booking,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverContact {
    pub name: String,
    pub phone: String,
}

impl Default for DriverContact {
    fn default() -> Self {
        Self {
            name: UNKNOWN_DRIVER.into(),
            phone: UNKNOWN_PHONE.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedVehicle {
    pub vehicle_id: Uuid,
    pub license_plate: Option<String>,
    pub location: Option<Coordinates>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBooking {
    pub booking: Booking,
    pub pickup_location: Option<Waypoint>,
    pub dropoff_location: Option<Waypoint>,
    pub vehicle: BookedVehicle,
    pub driver: DriverContact,
    pub route: Option<Route>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub active_vehicles: i64,
    pub active_routes: i64,
    pub total_routes: i64,
    pub total_bookings: i64,
    pub total_drivers: i64,
    pub total_passengers: i64,
    pub average_occupancy: f64,
    pub revenue_today: f64,
}
