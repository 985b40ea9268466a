use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Extension, Json, Path, Query,
};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{body, query};
use crate::api::views::{ActiveBooking, BookingConfirmation};
use crate::api::{DynAPI, SeatRequest};
use crate::auth::User;
use crate::error::Error;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParams {
    passenger_id: Option<Uuid>,
    vehicle_id: Uuid,
    pickup_stop: String,
    dropoff_stop: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerQuery {
    passenger_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverQuery {
    driver_id: Option<Uuid>,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    user: User,
    payload: Result<Json<CreateParams>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingConfirmation>), Error> {
    let params = body(payload)?;

    let request = SeatRequest {
        passenger_id: params.passenger_id.unwrap_or(user.id),
        vehicle_id: params.vehicle_id,
        pickup_stop: params.pickup_stop,
        dropoff_stop: params.dropoff_stop,
    };

    let confirmation = api.book_seat(user, request).await?;

    Ok((StatusCode::CREATED, confirmation.into()))
}

pub async fn active(
    Extension(api): Extension<DynAPI>,
    user: User,
    params: Result<Query<PassengerQuery>, QueryRejection>,
) -> Result<Json<ActiveBooking>, Error> {
    let passenger_id = query(params)?.passenger_id.unwrap_or(user.id);

    let booking = api.find_active_booking(user, passenger_id).await?;

    Ok(booking.into())
}

pub async fn list(
    Extension(api): Extension<DynAPI>,
    user: User,
    params: Result<Query<DriverQuery>, QueryRejection>,
) -> Result<Json<Value>, Error> {
    let driver_id = query(params)?.driver_id.unwrap_or(user.id);

    let bookings = api.list_driver_bookings(user, driver_id).await?;

    Ok(Json(json!({ "bookings": bookings })))
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(booking_id): Path<String>,
) -> Result<Json<Value>, Error> {
    let booking = api.accept_booking(user, booking_id).await?;

    Ok(Json(json!({ "booking": booking })))
}
