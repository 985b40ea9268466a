pub mod booking;
mod location;
mod member;
pub mod route;
pub mod trip;
pub mod vehicle;

pub use booking::{Booking, NewBooking, Status as BookingStatus};
pub use location::{Coordinates, Location};
pub use member::{Member, Role};
pub use route::{Route, Waypoint};
pub use trip::{Status as TripStatus, Trip};
pub use vehicle::{Status as VehicleStatus, Vehicle};
