use super::{require_text, Engine};

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::{
        views::{RouteMatch, VehicleSummary, UNKNOWN_DRIVER},
        RouteAPI,
    },
    auth::{Platform, User},
    entities::Route,
    error::Error,
};

#[async_trait]
impl RouteAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn list_routes(&self, user: User) -> Result<Vec<Route>, Error> {
        self.authorize(user, "list_routes", Platform::default())?;

        self.repo.list_routes().await
    }

    #[tracing::instrument(skip(self))]
    async fn search_routes(
        &self,
        user: User,
        pickup: String,
        destination: String,
    ) -> Result<Vec<RouteMatch>, Error> {
        require_text("pickup", &pickup)?;
        require_text("destination", &destination)?;

        self.authorize(user, "search_routes", Platform::default())?;

        let routes: Vec<Route> = self
            .repo
            .list_routes()
            .await?
            .into_iter()
            .filter(|route| route.serves(&pickup, &destination))
            .collect();

        tracing::info!("{} routes serve {} -> {}", routes.len(), pickup, destination);

        if routes.is_empty() {
            return Ok(vec![]);
        }

        let route_ids: Vec<Uuid> = routes.iter().map(|r| r.id).collect();
        let vehicles = self.repo.list_active_vehicles(&route_ids).await?;

        let mut driver_names: HashMap<Uuid, String> = HashMap::new();
        let mut by_route: HashMap<Uuid, Vec<VehicleSummary>> = HashMap::new();

        for vehicle in vehicles {
            let driver_name = match driver_names.get(&vehicle.driver_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .repo
                        .find_member(vehicle.driver_id)
                        .await?
                        .map_or_else(|| UNKNOWN_DRIVER.to_string(), |member| member.name);
                    driver_names.insert(vehicle.driver_id, name.clone());
                    name
                }
            };

            let route_id = vehicle.route_id;
            let mut summary = VehicleSummary::from(vehicle);
            summary.driver_name = Some(driver_name);

            by_route.entry(route_id).or_default().push(summary);
        }

        Ok(routes
            .into_iter()
            .map(|route| RouteMatch {
                vehicles: by_route.remove(&route.id).unwrap_or_default(),
                route,
            })
            .collect())
    }
}
