use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Extension, Json, Query,
};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{body, query};
use crate::api::views::{TripStarted, TripStopped};
use crate::api::DynAPI;
use crate::auth::User;
use crate::error::Error;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartParams {
    driver_id: Option<Uuid>,
    route_id: Uuid,
    available_seats: i32,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopParams {
    vehicle_id: Uuid,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverQuery {
    driver_id: Option<Uuid>,
}

pub async fn start(
    Extension(api): Extension<DynAPI>,
    user: User,
    payload: Result<Json<StartParams>, JsonRejection>,
) -> Result<(StatusCode, Json<TripStarted>), Error> {
    let params = body(payload)?;
    let driver_id = params.driver_id.unwrap_or(user.id);

    let started = api
        .start_trip(user, driver_id, params.route_id, params.available_seats)
        .await?;

    Ok((StatusCode::CREATED, started.into()))
}

pub async fn stop(
    Extension(api): Extension<DynAPI>,
    user: User,
    payload: Result<Json<StopParams>, JsonRejection>,
) -> Result<Json<TripStopped>, Error> {
    let params = body(payload)?;

    let stopped = api.stop_trip(user, params.vehicle_id).await?;

    Ok(stopped.into())
}

pub async fn active(
    Extension(api): Extension<DynAPI>,
    user: User,
    params: Result<Query<DriverQuery>, QueryRejection>,
) -> Result<Json<Value>, Error> {
    let driver_id = query(params)?.driver_id.unwrap_or(user.id);

    let trip = api.find_active_trip(user, driver_id).await?;

    Ok(Json(json!({ "trip": trip })))
}
