mod booking_api;
mod channel_api;
mod location_api;
mod route_api;
mod seat_ledger;
mod stats_api;
mod trip_api;

use oso::Oso;
use uuid::Uuid;

use crate::{
    api::API,
    auth::{authorizor, Platform, User},
    channel::Hub,
    db::DynRepository,
    error::{invalid_field_error, unauthorized_error, Error},
};

/// The ride core, written once against [`Repository`](crate::db::Repository).
pub struct Engine {
    repo: DynRepository,
    hub: Hub,
    authorizor: Oso,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(repo: DynRepository) -> Result<Self, Error> {
        Ok(Self {
            repo,
            hub: Hub::new(),
            authorizor: authorizor::new()?,
        })
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }
}

impl Engine {
    pub fn authorize<Actor, Action, Resource>(
        &self,
        actor: Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Actor: oso::ToPolar,
        Action: oso::ToPolar,
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(actor, action, resource)? {
            return Ok(());
        }

        Err(unauthorized_error())
    }

    /// Role check against the platform followed by an ownership check on
    /// the member the request is made for.
    fn authorize_for(&self, user: &User, action: &str, member_id: Uuid) -> Result<(), Error> {
        self.authorize(user.clone(), action, Platform::default())?;

        if !user.acts_for(member_id) {
            tracing::warn!("{} may not {} for {}", user.id, action, member_id);
            return Err(unauthorized_error());
        }

        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(invalid_field_error(field));
    }

    Ok(())
}

impl API for Engine {}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use super::Engine;
    use crate::auth::User;
    use crate::db::seed::{seed, DEMO_ADMIN_ID, DEMO_DRIVER_ID, DEMO_PASSENGER_ID};
    use crate::db::{MemoryStore, Repository};
    use crate::entities::{Role, Route};

    pub async fn engine() -> (Engine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        seed(store.as_ref()).await.unwrap();

        (Engine::new(store.clone()).unwrap(), store)
    }

    pub async fn route(store: &MemoryStore, name: &str) -> Route {
        store
            .list_routes()
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.name == name)
            .unwrap()
    }

    pub fn driver() -> User {
        User::new(DEMO_DRIVER_ID, Role::Driver)
    }

    pub fn passenger() -> User {
        User::new(DEMO_PASSENGER_ID, Role::Passenger)
    }

    pub fn admin() -> User {
        User::new(DEMO_ADMIN_ID, Role::Admin)
    }
}
