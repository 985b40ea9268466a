use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

/// Coarse classification of an [`Error`] by its code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Internal,
    Invalid,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self.code {
            102 => ErrorKind::Unauthenticated,
            103 => ErrorKind::Forbidden,
            100..=199 => ErrorKind::Invalid,
            200..=299 => ErrorKind::NotFound,
            300..=399 => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        policy_error(err)
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::warn!("rejecting bearer token: {}", err);
        unauthenticated_error()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("serialization failure: {}", err);
        unexpected_error()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self.kind() {
            ErrorKind::Internal => "Internal Server Error",
            _ => self.message.as_str(),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn invalid_state_error() -> Error {
    Error {
        code: 100,
        message: "invalid state".into(),
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        code: 101,
        message: "invalid input".into(),
    }
}

pub fn invalid_field_error(field: &str) -> Error {
    Error {
        code: 101,
        message: format!("missing or invalid field: {}", field),
    }
}

pub fn unauthenticated_error() -> Error {
    Error {
        code: 102,
        message: "access token required".into(),
    }
}

pub fn unauthorized_error() -> Error {
    Error {
        code: 103,
        message: "forbidden".into(),
    }
}

pub fn route_not_found_error() -> Error {
    Error {
        code: 200,
        message: "route not found".into(),
    }
}

pub fn vehicle_not_found_error() -> Error {
    Error {
        code: 201,
        message: "vehicle not found".into(),
    }
}

pub fn booking_not_found_error() -> Error {
    Error {
        code: 202,
        message: "booking not found".into(),
    }
}

pub fn no_active_trip_error() -> Error {
    Error {
        code: 203,
        message: "no active trip".into(),
    }
}

pub fn no_active_booking_error() -> Error {
    Error {
        code: 204,
        message: "no active booking".into(),
    }
}

pub fn no_seats_available_error() -> Error {
    Error {
        code: 300,
        message: "no seats available".into(),
    }
}

pub fn vehicle_inactive_error() -> Error {
    Error {
        code: 301,
        message: "vehicle is not on an active trip".into(),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::error!("database error: {:?}", err);
    Error {
        code: 2,
        message: "database error".into(),
    }
}

pub fn config_error(name: &str) -> Error {
    Error {
        code: 3,
        message: format!("invalid configuration value for {}", name),
    }
}

pub fn policy_error<T: Debug>(err: T) -> Error {
    tracing::error!("authorization policy error: {:?}", err);
    Error {
        code: 4,
        message: "policy error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: 5,
        message: "unexpected error".into(),
    }
}

#[test]
fn error_kinds_follow_code_ranges() {
    assert_eq!(invalid_input_error().kind(), ErrorKind::Invalid);
    assert_eq!(invalid_state_error().kind(), ErrorKind::Invalid);
    assert_eq!(unauthenticated_error().kind(), ErrorKind::Unauthenticated);
    assert_eq!(unauthorized_error().kind(), ErrorKind::Forbidden);
    assert_eq!(booking_not_found_error().kind(), ErrorKind::NotFound);
    assert_eq!(no_seats_available_error().kind(), ErrorKind::Conflict);
    assert_eq!(unexpected_error().kind(), ErrorKind::Internal);
}

#[test]
fn internal_errors_hide_their_message() {
    let response = database_error("connection reset").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = no_seats_available_error().into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
