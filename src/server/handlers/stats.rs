use axum::extract::{Extension, Json};
use serde_json::{json, Value};

use crate::api::DynAPI;
use crate::auth::User;
use crate::error::Error;

pub async fn find(Extension(api): Extension<DynAPI>, user: User) -> Result<Json<Value>, Error> {
    let stats = api.fleet_stats(user).await?;

    Ok(Json(json!({ "stats": stats })))
}
