use axum::extract::{rejection::JsonRejection, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::body;
use crate::api::DynAPI;
use crate::auth::User;
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct SearchParams {
    pickup: String,
    destination: String,
}

pub async fn list(Extension(api): Extension<DynAPI>, user: User) -> Result<Json<Value>, Error> {
    let routes = api.list_routes(user).await?;

    Ok(Json(json!({ "routes": routes })))
}

pub async fn search(
    Extension(api): Extension<DynAPI>,
    user: User,
    payload: Result<Json<SearchParams>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let params = body(payload)?;

    let routes = api
        .search_routes(user, params.pickup, params.destination)
        .await?;

    Ok(Json(json!({ "routes": routes })))
}
