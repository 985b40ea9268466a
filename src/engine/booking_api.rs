use super::{require_text, seat_ledger, Engine};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::{
        views::{ActiveBooking, BookedVehicle, BookingConfirmation, DriverContact},
        BookingAPI, SeatRequest,
    },
    auth::{Platform, User},
    db::Sequence,
    entities::{
        booking::{booking_code, DEFAULT_FARE},
        Booking, BookingStatus, NewBooking,
    },
    error::{
        booking_not_found_error, no_active_booking_error, unauthorized_error,
        vehicle_inactive_error, Error,
    },
};

const DEFAULT_PASSENGER_NAME: &str = "Passenger";

#[async_trait]
impl BookingAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn book_seat(
        &self,
        user: User,
        request: SeatRequest,
    ) -> Result<BookingConfirmation, Error> {
        require_text("pickupStop", &request.pickup_stop)?;
        require_text("dropoffStop", &request.dropoff_stop)?;

        self.authorize_for(&user, "book_seat", request.passenger_id)?;

        let reservation = seat_ledger::reserve_seat(self.repo.as_ref(), request.vehicle_id).await?;
        let vehicle = reservation.vehicle;

        let fare = self
            .repo
            .find_route(vehicle.route_id)
            .await?
            .map_or(DEFAULT_FARE, |route| route.base_fare);

        let passenger_name = self
            .repo
            .find_member(request.passenger_id)
            .await?
            .map_or_else(|| DEFAULT_PASSENGER_NAME.to_string(), |member| member.name);

        let booking_id = booking_code(self.repo.next_sequence(Sequence::BookingCode).await?);

        let mut booking = Booking::new(NewBooking {
            booking_id,
            vehicle_id: vehicle.vehicle_id,
            route_id: vehicle.route_id,
            driver_id: vehicle.driver_id,
            passenger_id: request.passenger_id,
            passenger_name,
            pickup_stop: request.pickup_stop,
            dropoff_stop: request.dropoff_stop,
            fare,
            seat_number: reservation.seat_number,
        });

        self.repo.insert_booking(&booking).await?;

        // a trip stopped after the reservation has already run its cancel cascade
        let still_active = self
            .repo
            .find_vehicle(vehicle.vehicle_id)
            .await?
            .map_or(false, |v| v.is_active());

        if !still_active {
            tracing::warn!(
                "vehicle {} parked while booking {}, cancelling it",
                vehicle.vehicle_id,
                booking.booking_id
            );
            booking.cancel()?;
            self.repo.update_booking(&booking).await?;
            return Err(vehicle_inactive_error());
        }

        let notified = self.hub.publish_new_booking(&booking).await;
        tracing::info!(
            "booking {} created for seat {}, {} listeners notified",
            booking.booking_id,
            booking.seat_number,
            notified
        );

        Ok(BookingConfirmation {
            booking_id: booking.booking_id.clone(),
            fare: booking.fare,
            seat_number: booking.seat_number,
            booking,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn accept_booking(&self, user: User, reference: String) -> Result<Booking, Error> {
        self.authorize(user.clone(), "accept_booking", Platform::default())?;

        let mut booking = self
            .repo
            .find_booking(&reference)
            .await?
            .ok_or_else(booking_not_found_error)?;

        if !user.acts_for(booking.driver_id) {
            return Err(unauthorized_error());
        }

        booking.accept();
        self.repo.update_booking(&booking).await?;

        tracing::info!("booking {} accepted", booking.booking_id);

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn list_driver_bookings(
        &self,
        user: User,
        driver_id: Uuid,
    ) -> Result<Vec<Booking>, Error> {
        self.authorize_for(&user, "list_bookings", driver_id)?;

        self.repo.list_bookings_for_driver(driver_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_active_booking(
        &self,
        user: User,
        passenger_id: Uuid,
    ) -> Result<ActiveBooking, Error> {
        self.authorize_for(&user, "read_active_booking", passenger_id)?;

        let booking = self
            .repo
            .find_latest_booking_for_passenger(passenger_id, &BookingStatus::ACTIVE)
            .await?
            .ok_or_else(no_active_booking_error)?;

        let vehicle = self.repo.find_vehicle(booking.vehicle_id).await?;
        let route = self.repo.find_route(booking.route_id).await?;

        let driver = self
            .repo
            .find_member(booking.driver_id)
            .await?
            .map(|member| DriverContact {
                name: member.name,
                phone: member.phone,
            })
            .unwrap_or_default();

        let pickup_location = route
            .as_ref()
            .and_then(|r| r.pickup_waypoint(&booking.pickup_stop))
            .cloned();
        let dropoff_location = route
            .as_ref()
            .and_then(|r| r.dropoff_waypoint(&booking.dropoff_stop))
            .cloned();

        let vehicle = BookedVehicle {
            vehicle_id: booking.vehicle_id,
            license_plate: vehicle.as_ref().map(|v| v.license_plate.clone()),
            location: vehicle.as_ref().map(|v| v.location.coordinates()).or_else(|| {
                route
                    .as_ref()
                    .and_then(|r| r.first_waypoint())
                    .map(|w| w.coordinates())
            }),
        };

        Ok(ActiveBooking {
            booking,
            pickup_location,
            dropoff_location,
            vehicle,
            driver,
            route,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use tokio::sync::Notify;

    use super::*;
    use crate::api::TripAPI;
    use crate::db::seed::seed;
    use crate::db::{MemoryStore, Repository};
    use crate::engine::fixtures::{self, driver, passenger};
    use crate::entities::{Location, Member, Role, Route, Trip, Vehicle};

    fn seat_request(passenger_id: Uuid, vehicle_id: Uuid) -> SeatRequest {
        SeatRequest {
            passenger_id,
            vehicle_id,
            pickup_stop: "Circle".into(),
            dropoff_stop: "Madina".into(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bookings_never_oversell() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 5)
            .await
            .unwrap();

        let engine = Arc::new(engine);
        let mut handles = vec![];

        for _ in 0..20 {
            let engine = engine.clone();
            let vehicle_id = started.vehicle_id;

            handles.push(tokio::spawn(async move {
                let passenger = User::new(Uuid::new_v4(), Role::Passenger);
                let request = seat_request(passenger.id, vehicle_id);
                engine.book_seat(passenger, request).await
            }));
        }

        let mut seats = HashSet::new();
        let mut rejected = 0;

        for handle in handles {
            match handle.await.unwrap() {
                Ok(confirmation) => assert!(seats.insert(confirmation.seat_number)),
                Err(err) => {
                    assert_eq!(err.code, 300);
                    rejected += 1;
                }
            }
        }

        assert_eq!(seats.len(), 5);
        assert_eq!(rejected, 15);

        let vehicle = store.find_vehicle(started.vehicle_id).await.unwrap().unwrap();
        assert_eq!(vehicle.available_seats, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn two_seat_vehicle_fills_then_rejects() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;

        let mut vehicle_two = Vehicle::new(driver().id, &route, 2);
        vehicle_two.capacity = 2;
        store.insert_vehicle(&vehicle_two).await.unwrap();

        let engine = Arc::new(engine);
        let first = {
            let engine = engine.clone();
            let id = vehicle_two.vehicle_id;
            tokio::spawn(async move {
                let p = User::new(Uuid::new_v4(), Role::Passenger);
                engine.book_seat(p.clone(), seat_request(p.id, id)).await
            })
        };
        let second = {
            let engine = engine.clone();
            let id = vehicle_two.vehicle_id;
            tokio::spawn(async move {
                let p = User::new(Uuid::new_v4(), Role::Passenger);
                engine.book_seat(p.clone(), seat_request(p.id, id)).await
            })
        };

        let mut seats = vec![
            first.await.unwrap().unwrap().seat_number,
            second.await.unwrap().unwrap().seat_number,
        ];
        seats.sort();
        assert_eq!(seats, vec![1, 2]);

        let p = User::new(Uuid::new_v4(), Role::Passenger);
        let err = engine
            .book_seat(p.clone(), seat_request(p.id, vehicle_two.vehicle_id))
            .await
            .unwrap_err();
        assert_eq!(err.code, 300);

        let vehicle = store.find_vehicle(vehicle_two.vehicle_id).await.unwrap().unwrap();
        assert_eq!(vehicle.available_seats, 0);
    }

    #[tokio::test]
    async fn booking_copies_fare_and_notifies_the_vehicle_room() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Kaneshie → Korle Bu → Osu").await;
        let driver = driver();
        let passenger = passenger();

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 14)
            .await
            .unwrap();

        let (connection, rx) = engine.hub().connect().await;
        engine.hub().subscribe(connection, started.vehicle_id).await;

        let confirmation = engine
            .book_seat(passenger.clone(), seat_request(passenger.id, started.vehicle_id))
            .await
            .unwrap();

        assert_eq!(confirmation.booking_id, "BK-000001");
        assert_eq!(confirmation.fare, 4.0);
        assert_eq!(confirmation.seat_number, 1);
        assert_eq!(confirmation.booking.passenger_name, "Test Passenger");
        assert_eq!(confirmation.booking.status, BookingStatus::Pending);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event, "new-booking");
        assert_eq!(event.data["passengerName"], "Test Passenger");
        assert_eq!(event.data["pickupStop"], "Circle");
        assert_eq!(event.data["dropoffStop"], "Madina");
    }

    #[tokio::test]
    async fn booking_rejects_unknown_and_parked_vehicles() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();
        let passenger = passenger();

        let err = engine
            .book_seat(passenger.clone(), seat_request(passenger.id, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.code, 201);

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 3)
            .await
            .unwrap();
        engine.stop_trip(driver.clone(), started.vehicle_id).await.unwrap();

        let err = engine
            .book_seat(passenger.clone(), seat_request(passenger.id, started.vehicle_id))
            .await
            .unwrap_err();
        assert_eq!(err.code, 301);

        let mut request = seat_request(passenger.id, started.vehicle_id);
        request.pickup_stop = " ".into();
        let err = engine.book_seat(passenger.clone(), request).await.unwrap_err();
        assert_eq!(err.code, 101);
    }

    #[tokio::test]
    async fn accepting_twice_is_fine() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();
        let passenger = passenger();

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 3)
            .await
            .unwrap();
        let confirmation = engine
            .book_seat(passenger.clone(), seat_request(passenger.id, started.vehicle_id))
            .await
            .unwrap();

        let first = engine
            .accept_booking(driver.clone(), confirmation.booking_id.clone())
            .await
            .unwrap();
        // by row id this time
        let second = engine
            .accept_booking(driver.clone(), confirmation.booking.id.to_string())
            .await
            .unwrap();

        assert_eq!(first.status, BookingStatus::Accepted);
        assert_eq!(second.status, BookingStatus::Accepted);

        let err = engine
            .accept_booking(driver.clone(), "BK-999999".into())
            .await
            .unwrap_err();
        assert_eq!(err.code, 202);
    }

    #[tokio::test]
    async fn driver_bookings_are_newest_first() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();
        let passenger = passenger();

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 3)
            .await
            .unwrap();

        for _ in 0..3 {
            engine
                .book_seat(passenger.clone(), seat_request(passenger.id, started.vehicle_id))
                .await
                .unwrap();
        }

        let bookings = engine
            .list_driver_bookings(driver.clone(), driver.id)
            .await
            .unwrap();
        let codes: Vec<_> = bookings.iter().map(|b| b.booking_id.as_str()).collect();

        assert_eq!(codes, vec!["BK-000003", "BK-000002", "BK-000001"]);
    }

    #[tokio::test]
    async fn active_booking_resolves_stops_and_driver() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();
        let passenger = passenger();

        let err = engine
            .find_active_booking(passenger.clone(), passenger.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, 204);

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 3)
            .await
            .unwrap();

        let mut request = seat_request(passenger.id, started.vehicle_id);
        request.pickup_stop = "Legon".into();
        request.dropoff_stop = "Somewhere Else".into();
        engine.book_seat(passenger.clone(), request).await.unwrap();

        let active = engine
            .find_active_booking(passenger.clone(), passenger.id)
            .await
            .unwrap();

        assert_eq!(active.pickup_location.unwrap().stop_name, "Legon");
        assert_eq!(active.dropoff_location.unwrap().stop_name, "Madina");
        assert_eq!(active.driver.name, "Test Driver");
        assert_eq!(active.driver.phone, "0247654321");
        assert_eq!(
            active.vehicle.location,
            Some(route.waypoints[0].coordinates())
        );

        // cancelled bookings are no longer active
        engine.stop_trip(driver.clone(), started.vehicle_id).await.unwrap();
        let err = engine
            .find_active_booking(passenger.clone(), passenger.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, 204);
    }

    /// Memory store that holds the first seat reservation until released.
    struct PausingStore {
        inner: MemoryStore,
        reserved: Notify,
        resume: Notify,
    }

    #[async_trait]
    impl Repository for PausingStore {
        async fn insert_member(&self, member: &Member) -> Result<(), Error> {
            self.inner.insert_member(member).await
        }
        async fn find_member(&self, id: Uuid) -> Result<Option<Member>, Error> {
            self.inner.find_member(id).await
        }
        async fn count_members(&self, role: Role) -> Result<i64, Error> {
            self.inner.count_members(role).await
        }
        async fn insert_route(&self, route: &Route) -> Result<(), Error> {
            self.inner.insert_route(route).await
        }
        async fn find_route(&self, id: Uuid) -> Result<Option<Route>, Error> {
            self.inner.find_route(id).await
        }
        async fn list_routes(&self) -> Result<Vec<Route>, Error> {
            self.inner.list_routes().await
        }
        async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), Error> {
            self.inner.insert_vehicle(vehicle).await
        }
        async fn find_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Vehicle>, Error> {
            self.inner.find_vehicle(vehicle_id).await
        }
        async fn list_vehicles(&self) -> Result<Vec<Vehicle>, Error> {
            self.inner.list_vehicles().await
        }
        async fn list_active_vehicles(&self, route_ids: &[Uuid]) -> Result<Vec<Vehicle>, Error> {
            self.inner.list_active_vehicles(route_ids).await
        }
        async fn update_vehicle_location(
            &self,
            vehicle_id: Uuid,
            location: &Location,
        ) -> Result<Option<Vehicle>, Error> {
            self.inner.update_vehicle_location(vehicle_id, location).await
        }
        async fn deactivate_vehicle(&self, vehicle_id: Uuid) -> Result<(), Error> {
            self.inner.deactivate_vehicle(vehicle_id).await
        }
        async fn deactivate_driver_vehicles(&self, driver_id: Uuid) -> Result<u64, Error> {
            self.inner.deactivate_driver_vehicles(driver_id).await
        }
        async fn reserve_seat(&self, vehicle_id: Uuid) -> Result<Vehicle, Error> {
            let vehicle = self.inner.reserve_seat(vehicle_id).await?;
            self.reserved.notify_one();
            self.resume.notified().await;
            Ok(vehicle)
        }
        async fn insert_trip(&self, trip: &Trip) -> Result<(), Error> {
            self.inner.insert_trip(trip).await
        }
        async fn find_active_trip_for_driver(
            &self,
            driver_id: Uuid,
        ) -> Result<Option<Trip>, Error> {
            self.inner.find_active_trip_for_driver(driver_id).await
        }
        async fn find_active_trip_for_vehicle(
            &self,
            vehicle_id: Uuid,
        ) -> Result<Option<Trip>, Error> {
            self.inner.find_active_trip_for_vehicle(vehicle_id).await
        }
        async fn update_trip(&self, trip: &Trip) -> Result<(), Error> {
            self.inner.update_trip(trip).await
        }
        async fn complete_active_trips(&self, driver_id: Uuid) -> Result<u64, Error> {
            self.inner.complete_active_trips(driver_id).await
        }
        async fn insert_booking(&self, booking: &Booking) -> Result<(), Error> {
            self.inner.insert_booking(booking).await
        }
        async fn find_booking(&self, reference: &str) -> Result<Option<Booking>, Error> {
            self.inner.find_booking(reference).await
        }
        async fn update_booking(&self, booking: &Booking) -> Result<(), Error> {
            self.inner.update_booking(booking).await
        }
        async fn list_bookings_for_driver(&self, driver_id: Uuid) -> Result<Vec<Booking>, Error> {
            self.inner.list_bookings_for_driver(driver_id).await
        }
        async fn find_latest_booking_for_passenger(
            &self,
            passenger_id: Uuid,
            statuses: &[BookingStatus],
        ) -> Result<Option<Booking>, Error> {
            self.inner
                .find_latest_booking_for_passenger(passenger_id, statuses)
                .await
        }
        async fn cancel_pending_bookings(&self, vehicle_id: Uuid) -> Result<u64, Error> {
            self.inner.cancel_pending_bookings(vehicle_id).await
        }
        async fn count_bookings(&self) -> Result<i64, Error> {
            self.inner.count_bookings().await
        }
        async fn sum_fares_since(&self, since: DateTime<Utc>) -> Result<f64, Error> {
            self.inner.sum_fares_since(since).await
        }
        async fn next_sequence(&self, sequence: Sequence) -> Result<i64, Error> {
            self.inner.next_sequence(sequence).await
        }
        async fn clear_rides(&self) -> Result<(), Error> {
            self.inner.clear_rides().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn booking_racing_a_stop_ends_cancelled() {
        let store = Arc::new(PausingStore {
            inner: MemoryStore::new(),
            reserved: Notify::new(),
            resume: Notify::new(),
        });
        seed(store.as_ref()).await.unwrap();

        let engine = Arc::new(Engine::new(store.clone()).unwrap());
        let route = fixtures::route(&store.inner, "Circle → Madina").await;
        let driver = driver();
        let passenger = passenger();

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 3)
            .await
            .unwrap();

        let booking = {
            let engine = engine.clone();
            let passenger = passenger.clone();
            let request = seat_request(passenger.id, started.vehicle_id);
            tokio::spawn(async move { engine.book_seat(passenger, request).await })
        };

        // the seat is taken but the booking row does not exist yet
        store.reserved.notified().await;
        let stopped = engine.stop_trip(driver.clone(), started.vehicle_id).await.unwrap();
        assert_eq!(stopped.cancelled_bookings, 0);
        store.resume.notify_one();

        let err = booking.await.unwrap().unwrap_err();
        assert_eq!(err.code, 301);

        let bookings = store.list_bookings_for_driver(driver.id).await.unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].status, BookingStatus::Cancelled);

        let err = engine
            .find_active_booking(passenger.clone(), passenger.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, 204);
    }
}
