use uuid::Uuid;

use crate::db::Repository;
use crate::entities::{vehicle::seat_number, Vehicle};
use crate::error::Error;

#[derive(Debug)]
pub struct Reservation {
    /// The vehicle as it stood right after the decrement.
    pub vehicle: Vehicle,
    pub seat_number: i32,
}

/// Takes one seat from the vehicle's ledger.
///
/// The check and the decrement are a single store operation, so concurrent
/// reservations can never take more seats than were available.
#[tracing::instrument(skip(repo))]
pub async fn reserve_seat(repo: &dyn Repository, vehicle_id: Uuid) -> Result<Reservation, Error> {
    let vehicle = repo.reserve_seat(vehicle_id).await.map_err(|err| {
        tracing::warn!("seat reservation rejected: {}", err);
        err
    })?;

    let seat_number = seat_number(vehicle.capacity, vehicle.available_seats + 1);

    tracing::info!(
        "seat {} reserved, {} left",
        seat_number,
        vehicle.available_seats
    );

    Ok(Reservation {
        vehicle,
        seat_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::entities::route::circle_madina;

    #[tokio::test]
    async fn seats_are_numbered_in_booking_order() {
        let store = MemoryStore::new();
        let mut vehicle = Vehicle::new(Uuid::new_v4(), &circle_madina(), 3);
        vehicle.capacity = 3;
        store.insert_vehicle(&vehicle).await.unwrap();

        let mut seats = vec![];
        for _ in 0..3 {
            seats.push(reserve_seat(&store, vehicle.vehicle_id).await.unwrap().seat_number);
        }

        assert_eq!(seats, vec![1, 2, 3]);
        assert_eq!(
            reserve_seat(&store, vehicle.vehicle_id).await.unwrap_err().code,
            300
        );
    }

    #[tokio::test]
    async fn numbering_picks_up_from_a_partly_full_vehicle() {
        let store = MemoryStore::new();
        let vehicle = Vehicle::new(Uuid::new_v4(), &circle_madina(), 10);
        store.insert_vehicle(&vehicle).await.unwrap();

        let reservation = reserve_seat(&store, vehicle.vehicle_id).await.unwrap();

        assert_eq!(reservation.seat_number, 5);
        assert_eq!(reservation.vehicle.available_seats, 9);
    }
}
