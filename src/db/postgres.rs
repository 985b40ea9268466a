use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    types::Json,
    Executor, Pool, Postgres, Row,
};
use uuid::Uuid;

use super::{Repository, Sequence};
use crate::entities::{Booking, BookingStatus, Location, Member, Role, Route, Trip, Vehicle};
use crate::error::{
    no_seats_available_error, vehicle_inactive_error, vehicle_not_found_error, Error,
};

/// PostgreSQL store. Each row keeps the full entity as a JSONB document next
/// to the key and status columns that queries filter on.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::new", skip(db_uri))]
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        // TODO: move this to migrations
        pool.execute("CREATE TABLE IF NOT EXISTS members (id UUID PRIMARY KEY, role VARCHAR NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS routes (id UUID PRIMARY KEY, name VARCHAR NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS vehicles (id UUID PRIMARY KEY, vehicle_id UUID UNIQUE NOT NULL, driver_id UUID NOT NULL, route_id UUID NOT NULL, status VARCHAR NOT NULL, available_seats INT4 NOT NULL, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS trips (id UUID PRIMARY KEY, trip_id VARCHAR UNIQUE NOT NULL, driver_id UUID NOT NULL, vehicle_id UUID NOT NULL, status VARCHAR NOT NULL, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS bookings (id UUID PRIMARY KEY, booking_id VARCHAR UNIQUE NOT NULL, vehicle_id UUID NOT NULL, driver_id UUID NOT NULL, passenger_id UUID NOT NULL, status VARCHAR NOT NULL, fare FLOAT8 NOT NULL, created_at TIMESTAMPTZ NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE SEQUENCE IF NOT EXISTS trip_codes").await?;
        pool.execute("CREATE SEQUENCE IF NOT EXISTS booking_codes")
            .await?;

        Ok(Self { pool })
    }
}

fn decode<T: DeserializeOwned>(row: &PgRow) -> Result<T, Error> {
    let Json(value): Json<T> = row.try_get("data")?;

    Ok(value)
}

fn decode_all<T: DeserializeOwned>(rows: &[PgRow]) -> Result<Vec<T>, Error> {
    rows.iter().map(decode).collect()
}

#[async_trait]
impl Repository for PgStore {
    #[tracing::instrument(skip(self))]
    async fn insert_member(&self, member: &Member) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO members (id, role, data) VALUES ($1, $2, $3) ON CONFLICT (id) DO UPDATE SET role = $2, data = $3")
                .bind(&member.id)
                .bind(member.role.name())
                .bind(Json(member)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(sqlx::query("SELECT data FROM members WHERE id = $1").bind(&id))
            .await?;

        maybe_row.as_ref().map(decode).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn count_members(&self, role: Role) -> Result<i64, Error> {
        let mut conn = self.pool.acquire().await?;

        let count: i64 = conn
            .fetch_one(
                sqlx::query("SELECT COUNT(*) AS count FROM members WHERE role = $1")
                    .bind(role.name()),
            )
            .await?
            .try_get("count")?;

        Ok(count)
    }

    #[tracing::instrument(skip(self))]
    async fn insert_route(&self, route: &Route) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO routes (id, name, data) VALUES ($1, $2, $3)")
                .bind(&route.id)
                .bind(&route.name)
                .bind(Json(route)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_route(&self, id: Uuid) -> Result<Option<Route>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(sqlx::query("SELECT data FROM routes WHERE id = $1").bind(&id))
            .await?;

        maybe_row.as_ref().map(decode).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn list_routes(&self) -> Result<Vec<Route>, Error> {
        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(sqlx::query("SELECT data FROM routes ORDER BY name"))
            .await?;

        decode_all(&rows)
    }

    #[tracing::instrument(skip(self))]
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO vehicles (id, vehicle_id, driver_id, route_id, status, available_seats, created_at, data) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
                .bind(&vehicle.id)
                .bind(&vehicle.vehicle_id)
                .bind(&vehicle.driver_id)
                .bind(&vehicle.route_id)
                .bind(vehicle.status.name())
                .bind(vehicle.available_seats)
                .bind(&vehicle.created_at)
                .bind(Json(vehicle)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_vehicle(&self, vehicle_id: Uuid) -> Result<Option<Vehicle>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(
                sqlx::query("SELECT data FROM vehicles WHERE vehicle_id = $1").bind(&vehicle_id),
            )
            .await?;

        maybe_row.as_ref().map(decode).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, Error> {
        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(sqlx::query("SELECT data FROM vehicles ORDER BY created_at"))
            .await?;

        decode_all(&rows)
    }

    #[tracing::instrument(skip(self))]
    async fn list_active_vehicles(&self, route_ids: &[Uuid]) -> Result<Vec<Vehicle>, Error> {
        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(
                sqlx::query("SELECT data FROM vehicles WHERE status = 'active' AND route_id = ANY($1) ORDER BY created_at DESC")
                    .bind(route_ids.to_vec()),
            )
            .await?;

        decode_all(&rows)
    }

    #[tracing::instrument(skip(self))]
    async fn update_vehicle_location(
        &self,
        vehicle_id: Uuid,
        location: &Location,
    ) -> Result<Option<Vehicle>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(
                sqlx::query("UPDATE vehicles SET data = jsonb_set(data, '{location}', $2) WHERE vehicle_id = $1 RETURNING data")
                    .bind(&vehicle_id)
                    .bind(Json(location)),
            )
            .await?;

        maybe_row.as_ref().map(decode).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn deactivate_vehicle(&self, vehicle_id: Uuid) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("UPDATE vehicles SET status = 'inactive', data = jsonb_set(data, '{status}', '\"inactive\"') WHERE vehicle_id = $1")
                .bind(&vehicle_id),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn deactivate_driver_vehicles(&self, driver_id: Uuid) -> Result<u64, Error> {
        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query("UPDATE vehicles SET status = 'inactive', data = jsonb_set(data, '{status}', '\"inactive\"') WHERE driver_id = $1 AND status = 'active'")
                    .bind(&driver_id),
            )
            .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn reserve_seat(&self, vehicle_id: Uuid) -> Result<Vehicle, Error> {
        let mut conn = self.pool.acquire().await?;

        // the guard and the decrement run as one statement under the row lock
        let maybe_row = conn
            .fetch_optional(
                sqlx::query(
                    "UPDATE vehicles
                    SET
                        available_seats = available_seats - 1,
                        data = jsonb_set(data, '{availableSeats}', to_jsonb(available_seats - 1))
                    WHERE
                        vehicle_id = $1
                        AND status = 'active'
                        AND available_seats > 0
                    RETURNING data",
                )
                .bind(&vehicle_id),
            )
            .await?;

        if let Some(row) = maybe_row {
            return decode(&row);
        }

        tracing::info!("seat guard rejected the reservation, classifying...");

        let maybe_row = conn
            .fetch_optional(
                sqlx::query("SELECT data FROM vehicles WHERE vehicle_id = $1").bind(&vehicle_id),
            )
            .await?;

        let vehicle: Vehicle = decode(&maybe_row.ok_or_else(vehicle_not_found_error)?)?;

        if !vehicle.is_active() {
            return Err(vehicle_inactive_error());
        }

        Err(no_seats_available_error())
    }

    #[tracing::instrument(skip(self))]
    async fn insert_trip(&self, trip: &Trip) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO trips (id, trip_id, driver_id, vehicle_id, status, created_at, data) VALUES ($1, $2, $3, $4, $5, $6, $7)")
                .bind(&trip.id)
                .bind(&trip.trip_id)
                .bind(&trip.driver_id)
                .bind(&trip.vehicle_id)
                .bind(trip.status.name())
                .bind(&trip.created_at)
                .bind(Json(trip)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_active_trip_for_driver(&self, driver_id: Uuid) -> Result<Option<Trip>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(
                sqlx::query("SELECT data FROM trips WHERE driver_id = $1 AND status = 'active' ORDER BY created_at DESC LIMIT 1")
                    .bind(&driver_id),
            )
            .await?;

        maybe_row.as_ref().map(decode).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn find_active_trip_for_vehicle(
        &self,
        vehicle_id: Uuid,
    ) -> Result<Option<Trip>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(
                sqlx::query("SELECT data FROM trips WHERE vehicle_id = $1 AND status = 'active' ORDER BY created_at DESC LIMIT 1")
                    .bind(&vehicle_id),
            )
            .await?;

        maybe_row.as_ref().map(decode).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn update_trip(&self, trip: &Trip) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("UPDATE trips SET status = $2, data = $3 WHERE id = $1")
                .bind(&trip.id)
                .bind(trip.status.name())
                .bind(Json(trip)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn complete_active_trips(&self, driver_id: Uuid) -> Result<u64, Error> {
        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query("UPDATE trips SET status = 'completed', data = jsonb_set(data, '{status}', '\"completed\"') WHERE driver_id = $1 AND status = 'active'")
                    .bind(&driver_id),
            )
            .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn insert_booking(&self, booking: &Booking) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO bookings (id, booking_id, vehicle_id, driver_id, passenger_id, status, fare, created_at, data) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
                .bind(&booking.id)
                .bind(&booking.booking_id)
                .bind(&booking.vehicle_id)
                .bind(&booking.driver_id)
                .bind(&booking.passenger_id)
                .bind(booking.status.name())
                .bind(booking.fare)
                .bind(&booking.created_at)
                .bind(Json(booking)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_booking(&self, reference: &str) -> Result<Option<Booking>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(
                sqlx::query("SELECT data FROM bookings WHERE booking_id = $1 OR id::text = $1")
                    .bind(reference),
            )
            .await?;

        maybe_row.as_ref().map(decode).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn update_booking(&self, booking: &Booking) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("UPDATE bookings SET status = $2, data = $3 WHERE id = $1")
                .bind(&booking.id)
                .bind(booking.status.name())
                .bind(Json(booking)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list_bookings_for_driver(&self, driver_id: Uuid) -> Result<Vec<Booking>, Error> {
        let mut conn = self.pool.acquire().await?;

        let rows = conn
            .fetch_all(
                sqlx::query("SELECT data FROM bookings WHERE driver_id = $1 ORDER BY created_at DESC")
                    .bind(&driver_id),
            )
            .await?;

        decode_all(&rows)
    }

    #[tracing::instrument(skip(self))]
    async fn find_latest_booking_for_passenger(
        &self,
        passenger_id: Uuid,
        statuses: &[BookingStatus],
    ) -> Result<Option<Booking>, Error> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.name()).collect();

        let mut conn = self.pool.acquire().await?;

        let maybe_row = conn
            .fetch_optional(
                sqlx::query("SELECT data FROM bookings WHERE passenger_id = $1 AND status = ANY($2) ORDER BY created_at DESC LIMIT 1")
                    .bind(&passenger_id)
                    .bind(statuses),
            )
            .await?;

        maybe_row.as_ref().map(decode).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_pending_bookings(&self, vehicle_id: Uuid) -> Result<u64, Error> {
        let mut conn = self.pool.acquire().await?;

        let result = conn
            .execute(
                sqlx::query("UPDATE bookings SET status = 'cancelled', data = jsonb_set(data, '{status}', '\"cancelled\"') WHERE vehicle_id = $1 AND status = 'pending'")
                    .bind(&vehicle_id),
            )
            .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn count_bookings(&self) -> Result<i64, Error> {
        let mut conn = self.pool.acquire().await?;

        let count: i64 = conn
            .fetch_one(sqlx::query("SELECT COUNT(*) AS count FROM bookings"))
            .await?
            .try_get("count")?;

        Ok(count)
    }

    #[tracing::instrument(skip(self))]
    async fn sum_fares_since(&self, since: DateTime<Utc>) -> Result<f64, Error> {
        let mut conn = self.pool.acquire().await?;

        let revenue: f64 = conn
            .fetch_one(
                sqlx::query("SELECT COALESCE(SUM(fare), 0)::FLOAT8 AS revenue FROM bookings WHERE created_at >= $1")
                    .bind(since),
            )
            .await?
            .try_get("revenue")?;

        Ok(revenue)
    }

    #[tracing::instrument(skip(self))]
    async fn next_sequence(&self, sequence: Sequence) -> Result<i64, Error> {
        let mut conn = self.pool.acquire().await?;

        let value: i64 = conn
            .fetch_one(sqlx::query("SELECT nextval($1::regclass) AS value").bind(sequence.name()))
            .await?
            .try_get("value")?;

        Ok(value)
    }

    #[tracing::instrument(skip(self))]
    async fn clear_rides(&self) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        tx.execute("DELETE FROM bookings").await?;
        tx.execute("DELETE FROM trips").await?;
        tx.execute(
            "UPDATE vehicles
            SET
                status = 'inactive',
                available_seats = (data->>'capacity')::INT4,
                data = data || jsonb_build_object('status', 'inactive', 'availableSeats', (data->>'capacity')::INT4)",
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
