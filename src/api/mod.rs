pub mod views;

use std::sync::Arc;

use async_channel::Receiver;
use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::User;
use crate::channel::{ConnectionId, Event};
use crate::entities::{Booking, Coordinates, Location, Route};
use crate::error::Error;
use views::{
    ActiveBooking, ActiveTrip, BookingConfirmation, FleetStats, RouteMatch, TripStarted,
    TripStopped, VehicleLocation,
};

#[derive(Debug, Clone)]
pub struct SeatRequest {
    pub passenger_id: Uuid,
    pub vehicle_id: Uuid,
    pub pickup_stop: String,
    pub dropoff_stop: String,
}

#[async_trait]
pub trait RouteAPI {
    async fn list_routes(&self, user: User) -> Result<Vec<Route>, Error>;
    async fn search_routes(
        &self,
        user: User,
        pickup: String,
        destination: String,
    ) -> Result<Vec<RouteMatch>, Error>;
}

#[async_trait]
pub trait TripAPI {
    async fn start_trip(
        &self,
        user: User,
        driver_id: Uuid,
        route_id: Uuid,
        available_seats: i32,
    ) -> Result<TripStarted, Error>;
    async fn stop_trip(&self, user: User, vehicle_id: Uuid) -> Result<TripStopped, Error>;
    async fn find_active_trip(&self, user: User, driver_id: Uuid) -> Result<ActiveTrip, Error>;
}

#[async_trait]
pub trait LocationAPI {
    async fn update_location(
        &self,
        user: User,
        vehicle_id: Uuid,
        coordinates: Coordinates,
    ) -> Result<Location, Error>;
    async fn find_vehicle_location(
        &self,
        user: User,
        vehicle_id: Uuid,
    ) -> Result<VehicleLocation, Error>;
}

#[async_trait]
pub trait BookingAPI {
    async fn book_seat(&self, user: User, request: SeatRequest)
        -> Result<BookingConfirmation, Error>;
    async fn accept_booking(&self, user: User, reference: String) -> Result<Booking, Error>;
    async fn list_driver_bookings(&self, user: User, driver_id: Uuid)
        -> Result<Vec<Booking>, Error>;
    async fn find_active_booking(
        &self,
        user: User,
        passenger_id: Uuid,
    ) -> Result<ActiveBooking, Error>;
}

#[async_trait]
pub trait StatsAPI {
    async fn fleet_stats(&self, user: User) -> Result<FleetStats, Error>;
}

/// Connection-scoped room membership for push clients. Unauthenticated.
#[async_trait]
pub trait ChannelAPI {
    async fn connect(&self) -> (ConnectionId, Receiver<Event>);
    async fn disconnect(&self, connection: ConnectionId);
    async fn subscribe(&self, connection: ConnectionId, vehicle_id: Uuid);
    async fn unsubscribe(&self, connection: ConnectionId, vehicle_id: Uuid);
}

pub trait API: RouteAPI + TripAPI + LocationAPI + BookingAPI + StatsAPI + ChannelAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
