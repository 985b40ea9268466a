use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{invalid_state_error, Error};

/// Fare charged when the booked vehicle's route can no longer be found.
pub const DEFAULT_FARE: f64 = 3.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub booking_id: String,
    pub vehicle_id: Uuid,
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub passenger_id: Uuid,
    pub passenger_name: String,
    pub pickup_stop: String,
    pub dropoff_stop: String,
    pub fare: f64,
    pub seat_number: i32,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

/// Booking lifecycle: `Pending` moves to `Accepted` or `Cancelled`.
///
/// `InProgress` and `Arrived` count as active when looking up a passenger's
/// current booking but no transition produces them yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted,
    Cancelled,
    InProgress,
    Arrived,
}

impl Status {
    pub const ACTIVE: [Status; 4] = [
        Status::Pending,
        Status::Accepted,
        Status::InProgress,
        Status::Arrived,
    ];

    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::Accepted => "accepted".into(),
            Self::Cancelled => "cancelled".into(),
            Self::InProgress => "in_progress".into(),
            Self::Arrived => "arrived".into(),
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

pub struct NewBooking {
    pub booking_id: String,
    pub vehicle_id: Uuid,
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub passenger_id: Uuid,
    pub passenger_name: String,
    pub pickup_stop: String,
    pub dropoff_stop: String,
    pub fare: f64,
    pub seat_number: i32,
}

impl Booking {
    pub fn new(params: NewBooking) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: params.booking_id,
            vehicle_id: params.vehicle_id,
            route_id: params.route_id,
            driver_id: params.driver_id,
            passenger_id: params.passenger_id,
            passenger_name: params.passenger_name,
            pickup_stop: params.pickup_stop,
            dropoff_stop: params.dropoff_stop,
            fare: params.fare,
            seat_number: params.seat_number,
            status: Status::Pending,
            created_at: Utc::now(),
        }
    }

    /// Matches either the row id or the human-readable booking code.
    pub fn is_referenced_by(&self, reference: &str) -> bool {
        self.booking_id == reference || self.id.to_string() == reference
    }

    /// Accepting is unconditional: re-accepting is a no-op and a cancelled
    /// booking is not protected.
    pub fn accept(&mut self) {
        self.status = Status::Accepted;
    }

    #[tracing::instrument(skip(self), fields(booking_id = %self.booking_id))]
    pub fn cancel(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Cancelled;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }
}

pub fn booking_code(sequence: i64) -> String {
    format!("BK-{:06}", sequence)
}

#[cfg(test)]
pub(crate) fn pending_booking() -> Booking {
    Booking::new(NewBooking {
        booking_id: booking_code(1),
        vehicle_id: Uuid::new_v4(),
        route_id: Uuid::new_v4(),
        driver_id: Uuid::new_v4(),
        passenger_id: Uuid::new_v4(),
        passenger_name: "Ama".into(),
        pickup_stop: "Circle".into(),
        dropoff_stop: "Madina".into(),
        fare: 3.5,
        seat_number: 1,
    })
}

#[test]
fn accept_is_idempotent() {
    let mut booking = pending_booking();

    booking.accept();
    booking.accept();

    assert_eq!(booking.status, Status::Accepted);
}

#[test]
fn only_pending_bookings_cancel() {
    let mut booking = pending_booking();
    booking.cancel().unwrap();
    assert_eq!(booking.status, Status::Cancelled);

    let mut booking = pending_booking();
    booking.accept();
    assert!(booking.cancel().is_err());
    assert_eq!(booking.status, Status::Accepted);
}

#[test]
fn referenced_by_code_or_id() {
    let booking = pending_booking();

    assert!(booking.is_referenced_by("BK-000001"));
    assert!(booking.is_referenced_by(&booking.id.to_string()));
    assert!(!booking.is_referenced_by("BK-000002"));
}

#[test]
fn unreachable_statuses_still_count_as_active() {
    assert!(Status::InProgress.is_active());
    assert!(Status::Arrived.is_active());
    assert!(!Status::Cancelled.is_active());
    assert_eq!(Status::InProgress.name(), "in_progress");
}
