use uuid::Uuid;

use super::Repository;
use crate::entities::{Member, Role, Route, Waypoint};
use crate::error::Error;

pub const DEMO_PASSENGER_ID: Uuid = Uuid::from_u128(0x7e1e_0000_0000_4000_8000_0000_0000_0001);
pub const DEMO_DRIVER_ID: Uuid = Uuid::from_u128(0x7e1e_0000_0000_4000_8000_0000_0000_0002);
pub const DEMO_ADMIN_ID: Uuid = Uuid::from_u128(0x7e1e_0000_0000_4000_8000_0000_0000_0003);

fn waypoint(lat: f64, lng: f64, stop_name: &str) -> Waypoint {
    Waypoint {
        lat,
        lng,
        stop_name: stop_name.into(),
    }
}

pub fn demo_members() -> Vec<Member> {
    vec![
        Member::new(
            DEMO_PASSENGER_ID,
            "Test Passenger",
            "0241234567",
            Role::Passenger,
        ),
        Member::new(DEMO_DRIVER_ID, "Test Driver", "0247654321", Role::Driver),
        Member::new(DEMO_ADMIN_ID, "Admin User", "0243456789", Role::Admin),
    ]
}

/// The Accra lines served out of the box.
pub fn reference_routes() -> Vec<Route> {
    vec![
        Route::new(
            "Circle → Madina",
            12.4,
            3.5,
            vec![
                waypoint(5.5600, -0.1969, "Circle"),
                waypoint(5.6108, -0.1850, "37 Military Hospital"),
                waypoint(5.6506, -0.1867, "Legon"),
                waypoint(5.6718, -0.1745, "Atomic Junction"),
                waypoint(5.6806, -0.1686, "Madina"),
            ],
        ),
        Route::new(
            "Kaneshie → Korle Bu → Osu",
            10.2,
            4.0,
            vec![
                waypoint(5.5558, -0.2367, "Kaneshie Market"),
                waypoint(5.5399, -0.2199, "Korle Bu Hospital"),
                waypoint(5.5519, -0.2060, "Ministries"),
                waypoint(5.5706, -0.1836, "Danquah Circle"),
                waypoint(5.5558, -0.1733, "Osu"),
            ],
        ),
        Route::new(
            "Tema Station → Spintex → Baatsona",
            9.4,
            3.0,
            vec![
                waypoint(5.6397, -0.0075, "Tema Station"),
                waypoint(5.6246, -0.0518, "Spintex Road"),
                waypoint(5.6189, -0.0357, "Michel Camp"),
                waypoint(5.6419, -0.0213, "Baatsona"),
            ],
        ),
        Route::new(
            "Achimota → Lapaz → Kaneshie",
            7.8,
            2.5,
            vec![
                waypoint(5.6108, -0.2280, "Achimota"),
                waypoint(5.6037, -0.2370, "Lapaz"),
                waypoint(5.5890, -0.2420, "Abeka Lapaz"),
                waypoint(5.5558, -0.2367, "Kaneshie"),
            ],
        ),
        Route::new(
            "Ashaiman → Tema → Community 1",
            6.6,
            2.0,
            vec![
                waypoint(5.6950, -0.0311, "Ashaiman"),
                waypoint(5.6397, -0.0075, "Tema Station"),
                waypoint(5.6667, 0.0167, "Community 1"),
            ],
        ),
    ]
}

/// Inserts reference routes and demo members. Does nothing when routes
/// already exist, so it is safe to run on every boot.
#[tracing::instrument(skip(repo))]
pub async fn seed(repo: &dyn Repository) -> Result<(), Error> {
    if !repo.list_routes().await?.is_empty() {
        tracing::info!("routes already present, skipping seed");
        return Ok(());
    }

    for route in reference_routes() {
        repo.insert_route(&route).await?;
    }

    for member in demo_members() {
        repo.insert_member(&member).await?;
    }

    tracing::info!("seeded reference routes and demo members");

    Ok(())
}
