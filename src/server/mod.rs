mod handlers;

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post, put},
    Router,
};

use crate::api::DynAPI;
use crate::auth::TokenKeys;
use crate::config::Config;
use crate::error::{unexpected_error, Error};
use crate::server::handlers::{bookings, channels, health, locations, routes, stats, trips};

pub fn app(api: DynAPI, keys: Arc<TokenKeys>) -> Router {
    Router::new()
        .route("/api/health", get(health::check))
        .route("/api/routes", get(routes::list))
        .route("/api/search-route", post(routes::search))
        .route("/api/vehicle-location/:vehicle_id", get(locations::find))
        .route("/api/book-seat", post(bookings::create))
        .route("/api/active-booking", get(bookings::active))
        .route("/api/driver/start-trip", post(trips::start))
        .route("/api/driver/active-trip", get(trips::active))
        .route("/api/driver/update-location", put(locations::update))
        .route("/api/driver/bookings", get(bookings::list))
        .route("/api/driver/accept-booking/:booking_id", put(bookings::accept))
        .route("/api/driver/stop-trip", post(trips::stop))
        .route("/api/admin/stats", get(stats::find))
        .route("/ws", get(channels::upgrade))
        .layer(Extension(api))
        .layer(Extension(keys))
}

pub async fn serve(api: DynAPI, config: &Config) -> Result<(), Error> {
    let keys = Arc::new(TokenKeys::new(&config.jwt_secret));
    let app = app(api, keys);

    let addr = config.addr();

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|err| {
            tracing::error!("server stopped: {}", err);
            unexpected_error()
        })
}
