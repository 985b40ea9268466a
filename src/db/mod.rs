mod memory;
mod postgres;
pub mod seed;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{Config, StoreKind};
use crate::entities::{Booking, BookingStatus, Location, Member, Role, Route, Trip, Vehicle};
use crate::error::{config_error, Error};

/// Named counters backing the human-readable trip and booking codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sequence {
    TripCode,
    BookingCode,
}

impl Sequence {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TripCode => "trip_codes",
            Self::BookingCode => "booking_codes",
        }
    }
}

/// Storage used by the engine.
///
/// Every method is a single store operation. `reserve_seat` and the bulk
/// status updates must be atomic on their own since the engine never wraps
/// calls in a transaction.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn insert_member(&self, member: &Member) -> Result<(), Error>;
    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, Error>;
    async fn count_members(&self, role: Role) -> Result<i64, Error>;

    async fn insert_route(&self, route: &Route) -> Result<(), Error>;
    async fn find_route(&self, id: Uuid) -> Result<Option<Route>, Error>;
    /// All routes ordered by name.
    async fn list_routes(&self) -> Result<Vec<Route>, Error>;

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), Error>;
    async fn find_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Vehicle>, Error>;
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, Error>;
    async fn list_active_vehicles(&self, route_ids: &[Uuid]) -> Result<Vec<Vehicle>, Error>;
    /// Stores the new location and returns the updated vehicle, `None` if unknown.
    async fn update_vehicle_location(
        &self,
        vehicle_id: Uuid,
        location: &Location,
    ) -> Result<Option<Vehicle>, Error>;
    async fn deactivate_vehicle(&self, vehicle_id: Uuid) -> Result<(), Error>;
    /// Parks every active vehicle of the driver, returning how many changed.
    async fn deactivate_driver_vehicles(&self, driver_id: Uuid) -> Result<u64, Error>;
    /// Conditionally decrements `available_seats` of an active vehicle in one
    /// atomic step and returns the vehicle after the decrement.
    ///
    /// Fails with vehicle-not-found, vehicle-inactive or no-seats-available.
    async fn reserve_seat(&self, vehicle_id: Uuid) -> Result<Vehicle, Error>;

    async fn insert_trip(&self, trip: &Trip) -> Result<(), Error>;
    /// Most recent active trip of the driver.
    async fn find_active_trip_for_driver(&self, driver_id: Uuid) -> Result<Option<Trip>, Error>;
    async fn find_active_trip_for_vehicle(&self, vehicle_id: Uuid)
        -> Result<Option<Trip>, Error>;
    async fn update_trip(&self, trip: &Trip) -> Result<(), Error>;
    /// Completes every active trip of the driver, returning how many changed.
    async fn complete_active_trips(&self, driver_id: Uuid) -> Result<u64, Error>;

    async fn insert_booking(&self, booking: &Booking) -> Result<(), Error>;
    /// Looks a booking up by row id or booking code.
    async fn find_booking(&self, reference: &str) -> Result<Option<Booking>, Error>;
    async fn update_booking(&self, booking: &Booking) -> Result<(), Error>;
    /// Newest first.
    async fn list_bookings_for_driver(&self, driver_id: Uuid) -> Result<Vec<Booking>, Error>;
    async fn find_latest_booking_for_passenger(
        &self,
        passenger_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Option<Booking>, Error>;
    /// Cancels every pending booking made against the vehicle.
    async fn cancel_pending_bookings(&self, vehicle_id: Uuid) -> Result<u64, Error>;
    async fn count_bookings(&self) -> Result<i64, Error>;
    async fn sum_fares_since(&self, since: DateTime<Utc>) -> Result<f64, Error>;

    async fn next_sequence(&self, sequence: Sequence) -> Result<i64, Error>;

    /// Drops bookings and trips and parks every vehicle with a full ledger.
    async fn clear_rides(&self) -> Result<(), Error>;
}

pub type DynRepository = Arc<dyn Repository>;

/// Opens the store selected by the configuration.
#[tracing::instrument(skip_all, fields(store = ?config.store))]
pub async fn connect(config: &Config) -> Result<DynRepository, Error> {
    match config.store {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| config_error("DATABASE_URL"))?;

            Ok(Arc::new(
                PgStore::new(url, config.database_max_connections).await?,
            ))
        }
    }
}
