use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Repository, Sequence};
use crate::entities::{
    Booking, BookingStatus, Location, Member, Role, Route, Trip, TripStatus, Vehicle,
    VehicleStatus,
};
use crate::error::{vehicle_not_found_error, Error};

/// In-process store for development and tests.
///
/// All tables sit behind one lock, so each method observes and mutates a
/// consistent snapshot. Vectors keep insertion order, which is creation order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    members: HashMap<Uuid, Member>,
    routes: Vec<Route>,
    vehicles: Vec<Vehicle>,
    trips: Vec<Trip>,
    bookings: Vec<Booking>,
    sequences: HashMap<Sequence, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn insert_member(&self, member: &Member) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        tables.members.insert(member.id, member.clone());
        Ok(())
    }

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, Error> {
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn count_members(&self, role: Role) -> Result<i64, Error> {
        let tables = self.tables.read().await;
        Ok(tables.members.values().filter(|m| m.role == role).count() as i64)
    }

    async fn insert_route(&self, route: &Route) -> Result<(), Error> {
        self.tables.write().await.routes.push(route.clone());
        Ok(())
    }

    async fn find_route(&self, id: Uuid) -> Result<Option<Route>, Error> {
        let tables = self.tables.read().await;
        Ok(tables.routes.iter().find(|r| r.id == id).cloned())
    }

    async fn list_routes(&self) -> Result<Vec<Route>, Error> {
        let mut routes = self.tables.read().await.routes.clone();
        routes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(routes)
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), Error> {
        self.tables.write().await.vehicles.push(vehicle.clone());
        Ok(())
    }

    async fn find_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Vehicle>, Error> {
        let tables = self.tables.read().await;
        Ok(tables.vehicle(vehicle_id).cloned())
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, Error> {
        Ok(self.tables.read().await.vehicles.clone())
    }

    async fn list_active_vehicles(&self, route_ids: &[Uuid]) -> Result<Vec<Vehicle>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .vehicles
            .iter()
            .filter(|v| v.is_active() && route_ids.contains(&v.route_id))
            .cloned()
            .collect())
    }

    async fn update_vehicle_location(
        &self,
        vehicle_id: Uuid,
        location: &Location,
    ) -> Result<Option<Vehicle>, Error> {
        let mut tables = self.tables.write().await;

        Ok(tables.vehicle_mut(vehicle_id).map(|vehicle| {
            vehicle.location = location.clone();
            vehicle.clone()
        }))
    }

    async fn deactivate_vehicle(&self, vehicle_id: Uuid) -> Result<(), Error> {
        let mut tables = self.tables.write().await;

        if let Some(vehicle) = tables.vehicle_mut(vehicle_id) {
            vehicle.deactivate();
        }

        Ok(())
    }

    async fn deactivate_driver_vehicles(&self, driver_id: Uuid) -> Result<u64, Error> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;

        for vehicle in tables
            .vehicles
            .iter_mut()
            .filter(|v| v.driver_id == driver_id && v.is_active())
        {
            vehicle.deactivate();
            changed += 1;
        }

        Ok(changed)
    }

    async fn reserve_seat(&self, vehicle_id: Uuid) -> Result<Vehicle, Error> {
        let mut tables = self.tables.write().await;

        let vehicle = tables
            .vehicle_mut(vehicle_id)
            .ok_or_else(vehicle_not_found_error)?;

        vehicle.take_seat()?;

        Ok(vehicle.clone())
    }

    async fn insert_trip(&self, trip: &Trip) -> Result<(), Error> {
        self.tables.write().await.trips.push(trip.clone());
        Ok(())
    }

    async fn find_active_trip_for_driver(&self, driver_id: Uuid) -> Result<Option<Trip>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .trips
            .iter()
            .rev()
            .find(|t| t.driver_id == driver_id && t.is_active())
            .cloned())
    }

    async fn find_active_trip_for_vehicle(
        &self,
        vehicle_id: Uuid,
    ) -> Result<Option<Trip>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .trips
            .iter()
            .rev()
            .find(|t| t.vehicle_id == vehicle_id && t.is_active())
            .cloned())
    }

    async fn update_trip(&self, trip: &Trip) -> Result<(), Error> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.trips.iter_mut().find(|t| t.id == trip.id) {
            *existing = trip.clone();
        }

        Ok(())
    }

    async fn complete_active_trips(&self, driver_id: Uuid) -> Result<u64, Error> {
        let mut tables = self.tables.write().await;
        let mut completed = 0;

        for trip in tables
            .trips
            .iter_mut()
            .filter(|t| t.driver_id == driver_id && t.is_active())
        {
            trip.status = TripStatus::Completed;
            completed += 1;
        }

        Ok(completed)
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), Error> {
        self.tables.write().await.bookings.push(booking.clone());
        Ok(())
    }

    async fn find_booking(&self, reference: &str) -> Result<Option<Booking>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .iter()
            .find(|b| b.is_referenced_by(reference))
            .cloned())
    }

    async fn update_booking(&self, booking: &Booking) -> Result<(), Error> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables.bookings.iter_mut().find(|b| b.id == booking.id) {
            *existing = booking.clone();
        }

        Ok(())
    }

    async fn list_bookings_for_driver(&self, driver_id: Uuid) -> Result<Vec<Booking>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .iter()
            .rev()
            .filter(|b| b.driver_id == driver_id)
            .cloned()
            .collect())
    }

    async fn find_latest_booking_for_passenger(
        &self,
        passenger_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Option<Booking>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .iter()
            .rev()
            .find(|b| b.passenger_id == passenger_id && statuses.contains(&b.status))
            .cloned())
    }

    async fn cancel_pending_bookings(&self, vehicle_id: Uuid) -> Result<u64, Error> {
        let mut tables = self.tables.write().await;
        let mut cancelled = 0;

        for booking in tables
            .bookings
            .iter_mut()
            .filter(|b| b.vehicle_id == vehicle_id && b.status == BookingStatus::Pending)
        {
            booking.cancel()?;
            cancelled += 1;
        }

        Ok(cancelled)
    }

    async fn count_bookings(&self) -> Result<i64, Error> {
        Ok(self.tables.read().await.bookings.len() as i64)
    }

    async fn sum_fares_since(&self, since: DateTime<Utc>) -> Result<f64, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .iter()
            .filter(|b| b.created_at >= since)
            .map(|b| b.fare)
            .sum())
    }

    async fn next_sequence(&self, sequence: Sequence) -> Result<i64, Error> {
        let mut tables = self.tables.write().await;
        let value = tables.sequences.entry(sequence).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn clear_rides(&self) -> Result<(), Error> {
        let mut tables = self.tables.write().await;

        tables.bookings.clear();
        tables.trips.clear();

        for vehicle in tables.vehicles.iter_mut() {
            vehicle.status = VehicleStatus::Inactive;
            vehicle.available_seats = vehicle.capacity;
        }

        Ok(())
    }
}

impl Tables {
    fn vehicle(&self, vehicle_id: Uuid) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.vehicle_id == vehicle_id)
    }

    fn vehicle_mut(&mut self, vehicle_id: Uuid) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.vehicle_id == vehicle_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::route::circle_madina;

    #[tokio::test]
    async fn reserve_seat_never_goes_negative() {
        let store = MemoryStore::new();
        let route = circle_madina();
        let vehicle = Vehicle::new(Uuid::new_v4(), &route, 1);
        store.insert_vehicle(&vehicle).await.unwrap();

        let reserved = store.reserve_seat(vehicle.vehicle_id).await.unwrap();
        assert_eq!(reserved.available_seats, 0);

        let err = store.reserve_seat(vehicle.vehicle_id).await.unwrap_err();
        assert_eq!(err.code, 300);

        let err = store.reserve_seat(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code, 201);
    }

    #[tokio::test]
    async fn complete_active_trips_only_touches_the_driver() {
        let store = MemoryStore::new();
        let route = circle_madina();
        let driver_id = Uuid::new_v4();

        let mine = Vehicle::new(driver_id, &route, 4);
        let theirs = Vehicle::new(Uuid::new_v4(), &route, 4);
        store.insert_trip(&Trip::new("TR-1".into(), &mine, &route)).await.unwrap();
        store.insert_trip(&Trip::new("TR-2".into(), &theirs, &route)).await.unwrap();

        assert_eq!(store.complete_active_trips(driver_id).await.unwrap(), 1);
        assert!(store.find_active_trip_for_driver(driver_id).await.unwrap().is_none());
        assert!(store
            .find_active_trip_for_driver(theirs.driver_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn clear_rides_parks_vehicles_with_full_seats() {
        let store = MemoryStore::new();
        let route = circle_madina();
        let vehicle = Vehicle::new(Uuid::new_v4(), &route, 3);
        store.insert_vehicle(&vehicle).await.unwrap();
        store.insert_trip(&Trip::new("TR-1".into(), &vehicle, &route)).await.unwrap();
        store.reserve_seat(vehicle.vehicle_id).await.unwrap();

        let booking = crate::entities::booking::pending_booking();
        store.insert_booking(&booking).await.unwrap();

        store.clear_rides().await.unwrap();

        let parked = store.find_vehicle(vehicle.vehicle_id).await.unwrap().unwrap();
        assert_eq!(parked.status, VehicleStatus::Inactive);
        assert_eq!(parked.available_seats, parked.capacity);
        assert_eq!(parked.location, vehicle.location);
        assert_eq!(store.count_bookings().await.unwrap(), 0);
        assert!(store
            .find_active_trip_for_driver(vehicle.driver_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn sequences_count_independently() {
        let store = MemoryStore::new();

        assert_eq!(store.next_sequence(Sequence::TripCode).await.unwrap(), 1);
        assert_eq!(store.next_sequence(Sequence::TripCode).await.unwrap(), 2);
        assert_eq!(store.next_sequence(Sequence::BookingCode).await.unwrap(), 1);
    }
}
