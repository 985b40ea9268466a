use axum::extract::{rejection::JsonRejection, Extension, Json, Path};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::body;
use crate::api::views::VehicleLocation;
use crate::api::DynAPI;
use crate::auth::User;
use crate::entities::Coordinates;
use crate::error::Error;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParams {
    vehicle_id: Uuid,
    lat: f64,
    lng: f64,
}

pub async fn update(
    Extension(api): Extension<DynAPI>,
    user: User,
    payload: Result<Json<UpdateParams>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let params = body(payload)?;
    let coordinates = Coordinates {
        lat: params.lat,
        lng: params.lng,
    };

    let location = api
        .update_location(user, params.vehicle_id, coordinates)
        .await?;

    Ok(Json(json!({ "success": true, "location": location })))
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    user: User,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<VehicleLocation>, Error> {
    let location = api.find_vehicle_location(user, vehicle_id).await?;

    Ok(location.into())
}
