pub mod authorizor;
mod platform;
mod token;
mod user;

pub use platform::Platform;
pub use token::{Claims, TokenKeys};
pub use user::User;
