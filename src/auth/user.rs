use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Role;

/// Caller identity, taken from the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl User {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self {
            id,
            roles: vec![role.name()],
        }
    }

    pub fn new_system_user() -> Self {
        Self {
            id: Uuid::new_v4(),
            roles: vec!["system".into()],
        }
    }

    fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|x| x == role)
    }

    /// Drivers and passengers act for themselves only; system and admin
    /// callers may act for any member.
    pub fn acts_for(&self, member_id: Uuid) -> bool {
        self.id == member_id || self.has_role("system") || self.has_role("admin")
    }
}

impl PolarClass for User {
    fn get_polar_class_builder() -> oso::ClassBuilder<User> {
        oso::Class::builder()
            .name("User")
            .add_attribute_getter("roles", |recv: &User| recv.roles.clone())
    }

    fn get_polar_class() -> oso::Class {
        let builder = User::get_polar_class_builder();
        builder.build()
    }
}

#[test]
fn members_act_for_themselves() {
    let driver = User::new(Uuid::new_v4(), Role::Driver);

    assert!(driver.acts_for(driver.id));
    assert!(!driver.acts_for(Uuid::new_v4()));
    assert!(User::new_system_user().acts_for(driver.id));
    assert!(User::new(Uuid::new_v4(), Role::Admin).acts_for(driver.id));
}
