pub mod bookings;
pub mod channels;
pub mod health;
pub mod locations;
pub mod routes;
pub mod stats;
pub mod trips;

use axum::extract::{
    rejection::{JsonRejection, QueryRejection},
    Json, Query,
};

use crate::error::{invalid_input_error, Error};

/// Unwraps a JSON body, turning malformed or incomplete payloads into an
/// invalid-input error instead of axum's plain-text rejection.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(err) => {
            tracing::warn!("rejecting request body: {}", err);
            Err(invalid_input_error())
        }
    }
}

/// Same as [`body`] for query strings.
pub(crate) fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, Error> {
    match params {
        Ok(Query(value)) => Ok(value),
        Err(err) => {
            tracing::warn!("rejecting query string: {}", err);
            Err(invalid_input_error())
        }
    }
}
