//! Shared profile store: the last submitted personal details, read by the
//! other screens to decide where to send the user.

pub mod routes;
pub mod store;

pub use routes::profile_routes;
pub use store::{NextScreen, ProfileStore, settings_keys};
