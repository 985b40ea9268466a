use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::{
        views::{ActiveTrip, TripStarted, TripStopped},
        TripAPI,
    },
    auth::{Platform, User},
    db::Sequence,
    entities::{trip::trip_code, Trip, Vehicle},
    error::{
        invalid_field_error, no_active_trip_error, route_not_found_error, unauthorized_error,
        Error,
    },
};

#[async_trait]
impl TripAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn start_trip(
        &self,
        user: User,
        driver_id: Uuid,
        route_id: Uuid,
        available_seats: i32,
    ) -> Result<TripStarted, Error> {
        if available_seats <= 0 {
            return Err(invalid_field_error("availableSeats"));
        }

        self.authorize_for(&user, "start_trip", driver_id)?;

        let route = self
            .repo
            .find_route(route_id)
            .await?
            .ok_or_else(route_not_found_error)?;

        // a driver runs one trip at a time, starting a new one closes the old
        let parked = self.repo.deactivate_driver_vehicles(driver_id).await?;
        let closed = self.repo.complete_active_trips(driver_id).await?;
        if parked > 0 || closed > 0 {
            tracing::info!("closed {} trips and parked {} vehicles", closed, parked);
        }

        let vehicle = Vehicle::new(driver_id, &route, available_seats);
        self.repo.insert_vehicle(&vehicle).await?;

        let trip_id = trip_code(self.repo.next_sequence(Sequence::TripCode).await?);
        let trip = Trip::new(trip_id, &vehicle, &route);
        self.repo.insert_trip(&trip).await?;

        tracing::info!("trip {} started on {}", trip.trip_id, route.name);

        Ok(TripStarted {
            vehicle_id: vehicle.vehicle_id,
            trip_id: trip.trip_id.clone(),
            route: route.name,
            trip,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn stop_trip(&self, user: User, vehicle_id: Uuid) -> Result<TripStopped, Error> {
        self.authorize(user.clone(), "stop_trip", Platform::default())?;

        let mut trip = self
            .repo
            .find_active_trip_for_vehicle(vehicle_id)
            .await?
            .ok_or_else(no_active_trip_error)?;

        if !user.acts_for(trip.driver_id) {
            return Err(unauthorized_error());
        }

        trip.complete()?;
        self.repo.update_trip(&trip).await?;
        self.repo.deactivate_vehicle(vehicle_id).await?;

        let cancelled_bookings = self.repo.cancel_pending_bookings(vehicle_id).await?;

        tracing::info!(
            "trip {} completed, {} pending bookings cancelled",
            trip.trip_id,
            cancelled_bookings
        );

        Ok(TripStopped {
            trip_id: trip.trip_id,
            vehicle_id,
            cancelled_bookings,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn find_active_trip(&self, user: User, driver_id: Uuid) -> Result<ActiveTrip, Error> {
        self.authorize_for(&user, "read_active_trip", driver_id)?;

        let trip = self
            .repo
            .find_active_trip_for_driver(driver_id)
            .await?
            .ok_or_else(no_active_trip_error)?;

        let vehicle = self.repo.find_vehicle(trip.vehicle_id).await?;
        let route = self.repo.find_route(trip.route_id).await?;

        Ok(ActiveTrip::new(trip, vehicle, route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BookingAPI, SeatRequest};
    use crate::db::Repository;
    use crate::engine::fixtures::{self, driver, passenger};
    use crate::entities::{BookingStatus, Role};

    #[tokio::test]
    async fn starting_twice_leaves_one_active_trip() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();

        let first = engine
            .start_trip(driver.clone(), driver.id, route.id, 10)
            .await
            .unwrap();
        let second = engine
            .start_trip(driver.clone(), driver.id, route.id, 12)
            .await
            .unwrap();

        assert_eq!(first.trip_id, "TR-000001");
        assert_eq!(second.trip_id, "TR-000002");

        let active = engine.find_active_trip(driver.clone(), driver.id).await.unwrap();
        assert_eq!(active.trip_id, second.trip_id);
        assert_eq!(active.available_seats, 12);
        assert_eq!(active.waypoints.len(), 5);

        let old_vehicle = store.find_vehicle(first.vehicle_id).await.unwrap().unwrap();
        assert!(!old_vehicle.is_active());
        assert!(store
            .find_active_trip_for_vehicle(first.vehicle_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn starting_parks_every_active_vehicle_of_the_driver() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();

        // two windows left open side by side, as concurrent starts can leave them
        let mut stale = Vec::new();
        for code in ["TR-OLD-1", "TR-OLD-2"] {
            let vehicle = Vehicle::new(driver.id, &route, 6);
            store.insert_vehicle(&vehicle).await.unwrap();
            store
                .insert_trip(&Trip::new(code.into(), &vehicle, &route))
                .await
                .unwrap();
            stale.push(vehicle.vehicle_id);
        }

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 8)
            .await
            .unwrap();

        let active: Vec<_> = store
            .list_vehicles()
            .await
            .unwrap()
            .into_iter()
            .filter(|v| v.driver_id == driver.id && v.is_active())
            .map(|v| v.vehicle_id)
            .collect();
        assert_eq!(active, vec![started.vehicle_id]);

        for vehicle_id in stale {
            let err = engine
                .book_seat(
                    passenger(),
                    SeatRequest {
                        passenger_id: passenger().id,
                        vehicle_id,
                        pickup_stop: "Circle".into(),
                        dropoff_stop: "Legon".into(),
                    },
                )
                .await
                .unwrap_err();
            assert_eq!(err.code, 301);
        }
    }

    #[tokio::test]
    async fn start_trip_validates_before_touching_the_store() {
        let (engine, store) = fixtures::engine().await;
        let driver = driver();

        let err = engine
            .start_trip(driver.clone(), driver.id, Uuid::new_v4(), 0)
            .await
            .unwrap_err();
        assert_eq!(err.code, 101);

        let err = engine
            .start_trip(driver.clone(), driver.id, Uuid::new_v4(), 4)
            .await
            .unwrap_err();
        assert_eq!(err.code, 200);

        assert!(store.list_vehicles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn over_capacity_requests_are_kept() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 20)
            .await
            .unwrap();

        assert_eq!(started.trip.available_seats, 20);
        assert_eq!(started.trip.capacity, 14);
    }

    #[tokio::test]
    async fn stop_cancels_pending_and_keeps_accepted_bookings() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();
        let passenger = passenger();

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 5)
            .await
            .unwrap();

        let request = SeatRequest {
            passenger_id: passenger.id,
            vehicle_id: started.vehicle_id,
            pickup_stop: "Circle".into(),
            dropoff_stop: "Legon".into(),
        };
        let kept = engine.book_seat(passenger.clone(), request.clone()).await.unwrap();
        let dropped = engine.book_seat(passenger.clone(), request).await.unwrap();

        engine
            .accept_booking(driver.clone(), kept.booking_id.clone())
            .await
            .unwrap();

        let stopped = engine.stop_trip(driver.clone(), started.vehicle_id).await.unwrap();
        assert_eq!(stopped.cancelled_bookings, 1);

        let kept = store.find_booking(&kept.booking_id).await.unwrap().unwrap();
        let dropped = store.find_booking(&dropped.booking_id).await.unwrap().unwrap();
        assert_eq!(kept.status, BookingStatus::Accepted);
        assert_eq!(dropped.status, BookingStatus::Cancelled);

        // seats taken by cancelled bookings stay off the ledger
        let vehicle = store.find_vehicle(started.vehicle_id).await.unwrap().unwrap();
        assert!(!vehicle.is_active());
        assert_eq!(vehicle.available_seats, 3);

        let trips = store.find_active_trip_for_driver(driver.id).await.unwrap();
        assert!(trips.is_none());

        let err = engine.stop_trip(driver.clone(), started.vehicle_id).await.unwrap_err();
        assert_eq!(err.code, 203);

        let err = engine.find_active_trip(driver.clone(), driver.id).await.unwrap_err();
        assert_eq!(err.code, 203);
    }

    #[tokio::test]
    async fn drivers_only_manage_their_own_trips() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();
        let stranger = User::new(Uuid::new_v4(), Role::Driver);

        let err = engine
            .start_trip(stranger.clone(), driver.id, route.id, 4)
            .await
            .unwrap_err();
        assert_eq!(err.code, 103);

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 4)
            .await
            .unwrap();

        let err = engine
            .stop_trip(stranger.clone(), started.vehicle_id)
            .await
            .unwrap_err();
        assert_eq!(err.code, 103);

        let err = engine
            .start_trip(passenger(), driver.id, route.id, 4)
            .await
            .unwrap_err();
        assert_eq!(err.code, 103);
    }
}
