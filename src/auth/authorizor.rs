use oso::{Oso, PolarClass};

use crate::auth::{Platform, User};
use crate::error::Error;

pub fn new() -> Result<Oso, Error> {
    let mut o = Oso::new();

    o.register_class(Platform::get_polar_class())?;
    o.register_class(User::get_polar_class())?;

    o.load_str(include_str!("rules.polar"))?;

    Ok(o)
}

#[cfg(test)]
fn member(role: crate::entities::Role) -> User {
    User::new(uuid::Uuid::new_v4(), role)
}

#[test]
fn system_role_test() {
    let authorizor = new().unwrap();
    let system = User::new_system_user();

    for action in ["start_trip", "book_seat", "read_stats", "anything_else"] {
        let result = authorizor.is_allowed(system.clone(), action, Platform::default());
        assert_eq!(result.unwrap(), true);
    }
}

#[test]
fn driver_role_test() {
    use crate::entities::Role;

    let authorizor = new().unwrap();
    let driver = member(Role::Driver);

    for action in [
        "start_trip",
        "stop_trip",
        "read_active_trip",
        "update_location",
        "list_bookings",
        "accept_booking",
        "list_routes",
        "read_vehicle_location",
    ] {
        let result = authorizor.is_allowed(driver.clone(), action, Platform::default());
        assert_eq!(result.unwrap(), true, "driver should be allowed to {}", action);
    }

    for action in ["book_seat", "search_routes", "read_stats"] {
        let result = authorizor.is_allowed(driver.clone(), action, Platform::default());
        assert_eq!(result.unwrap(), false, "driver should not be allowed to {}", action);
    }
}

#[test]
fn passenger_role_test() {
    use crate::entities::Role;

    let authorizor = new().unwrap();
    let passenger = member(Role::Passenger);

    for action in ["search_routes", "book_seat", "read_active_booking", "list_routes"] {
        let result = authorizor.is_allowed(passenger.clone(), action, Platform::default());
        assert_eq!(result.unwrap(), true);
    }

    for action in ["start_trip", "update_location", "accept_booking", "read_stats"] {
        let result = authorizor.is_allowed(passenger.clone(), action, Platform::default());
        assert_eq!(result.unwrap(), false);
    }
}

#[test]
fn admin_and_roleless_test() {
    use crate::entities::Role;

    let authorizor = new().unwrap();

    let admin = member(Role::Admin);
    let result = authorizor.is_allowed(admin.clone(), "read_stats", Platform::default());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(admin.clone(), "book_seat", Platform::default());
    assert_eq!(result.unwrap(), false);

    let nobody = User {
        id: uuid::Uuid::new_v4(),
        roles: vec![],
    };
    let result = authorizor.is_allowed(nobody, "list_routes", Platform::default());
    assert_eq!(result.unwrap(), false);
}

#[test]
fn any_held_role_grants_its_actions() {
    let authorizor = new().unwrap();

    let both = User {
        id: uuid::Uuid::new_v4(),
        roles: vec!["passenger".into(), "driver".into()],
    };

    for action in ["book_seat", "start_trip"] {
        let result = authorizor.is_allowed(both.clone(), action, Platform::default());
        assert_eq!(result.unwrap(), true);
    }

    let result = authorizor.is_allowed(both, "read_stats", Platform::default());
    assert_eq!(result.unwrap(), false);
}
