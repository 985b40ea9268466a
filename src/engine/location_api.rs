use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::{views::VehicleLocation, LocationAPI},
    auth::{Platform, User},
    entities::{Coordinates, Location},
    error::{unauthorized_error, vehicle_not_found_error, Error},
};

#[async_trait]
impl LocationAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn update_location(
        &self,
        user: User,
        vehicle_id: Uuid,
        coordinates: Coordinates,
    ) -> Result<Location, Error> {
        coordinates.validate()?;

        self.authorize(user.clone(), "update_location", Platform::default())?;

        let vehicle = self
            .repo
            .find_vehicle(vehicle_id)
            .await?
            .ok_or_else(vehicle_not_found_error)?;

        if !user.acts_for(vehicle.driver_id) {
            return Err(unauthorized_error());
        }

        let location = Location::now(coordinates);

        self.repo
            .update_vehicle_location(vehicle_id, &location)
            .await?
            .ok_or_else(vehicle_not_found_error)?;

        // the store is updated before anyone hears about it
        let delivered = self.hub.publish_location(vehicle_id, coordinates).await;
        tracing::info!("location pushed to {} subscriptions", delivered);

        Ok(location)
    }

    #[tracing::instrument(skip(self))]
    async fn find_vehicle_location(
        &self,
        user: User,
        vehicle_id: Uuid,
    ) -> Result<VehicleLocation, Error> {
        self.authorize(user.clone(), "read_vehicle_location", Platform::default())?;

        let vehicle = self
            .repo
            .find_vehicle(vehicle_id)
            .await?
            .ok_or_else(vehicle_not_found_error)?;

        let route = self.repo.find_route(vehicle.route_id).await?;

        Ok(VehicleLocation {
            location: vehicle.location.clone(),
            vehicle: vehicle.into(),
            route,
        })
    }
}
