use super::Engine;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    api::{views::FleetStats, StatsAPI},
    auth::{Platform, User},
    entities::Role,
    error::{unexpected_error, Error},
};

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn start_of_day(now: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .ok_or_else(unexpected_error)
}

#[async_trait]
impl StatsAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn fleet_stats(&self, user: User) -> Result<FleetStats, Error> {
        self.authorize(user, "read_stats", Platform::default())?;

        let vehicles = self.repo.list_vehicles().await?;
        let total_routes = self.repo.list_routes().await?.len() as i64;

        let active_vehicles = vehicles.iter().filter(|v| v.is_active()).count() as i64;

        let occupancies: Vec<f64> = vehicles.iter().filter_map(|v| v.occupancy()).collect();
        let average_occupancy = if occupancies.is_empty() {
            0.0
        } else {
            round_to(occupancies.iter().sum::<f64>() / occupancies.len() as f64, 1)
        };

        let revenue_today = self
            .repo
            .sum_fares_since(start_of_day(Utc::now())?)
            .await?;

        Ok(FleetStats {
            active_vehicles,
            active_routes: total_routes,
            total_routes,
            total_bookings: self.repo.count_bookings().await?,
            total_drivers: self.repo.count_members(Role::Driver).await?,
            total_passengers: self.repo.count_members(Role::Passenger).await?,
            average_occupancy,
            revenue_today: round_to(revenue_today, 2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BookingAPI, SeatRequest, TripAPI};
    use crate::engine::fixtures::{self, admin, driver, passenger};

    #[test]
    fn midnight_is_utc() {
        let now: DateTime<Utc> = "2024-03-09T17:45:12Z".parse().unwrap();
        let midnight: DateTime<Utc> = "2024-03-09T00:00:00Z".parse().unwrap();

        assert_eq!(start_of_day(now).unwrap(), midnight);
    }

    #[tokio::test]
    async fn empty_fleet() {
        let (engine, _) = fixtures::engine().await;

        let stats = engine.fleet_stats(admin()).await.unwrap();

        assert_eq!(
            stats,
            FleetStats {
                active_vehicles: 0,
                active_routes: 5,
                total_routes: 5,
                total_bookings: 0,
                total_drivers: 1,
                total_passengers: 1,
                average_occupancy: 0.0,
                revenue_today: 0.0,
            }
        );
    }

    #[tokio::test]
    async fn occupancy_and_revenue_follow_bookings() {
        let (engine, store) = fixtures::engine().await;
        let route = fixtures::route(&store, "Circle → Madina").await;
        let driver = driver();
        let passenger = passenger();

        let started = engine
            .start_trip(driver.clone(), driver.id, route.id, 14)
            .await
            .unwrap();

        for _ in 0..2 {
            let request = SeatRequest {
                passenger_id: passenger.id,
                vehicle_id: started.vehicle_id,
                pickup_stop: "Circle".into(),
                dropoff_stop: "Madina".into(),
            };
            engine.book_seat(passenger.clone(), request).await.unwrap();
        }

        let stats = engine.fleet_stats(admin()).await.unwrap();

        assert_eq!(stats.active_vehicles, 1);
        assert_eq!(stats.total_bookings, 2);
        // 2 of 14 seats
        assert_eq!(stats.average_occupancy, 14.3);
        assert_eq!(stats.revenue_today, 7.0);

        let err = engine.fleet_stats(passenger.clone()).await.unwrap_err();
        assert_eq!(err.code, 103);
    }
}
