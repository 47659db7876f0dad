pub mod attribution;
pub mod error_code;
pub mod health;
pub mod helpers;
pub mod links;
pub mod redirect;
pub mod routes;
pub mod tracking_code;
pub mod types;
pub mod username;

pub use error_code::ErrorCode;
pub use health::{AppStartTime, HealthService, health_routes};
pub use helpers::AuthenticatedProfile;
pub use redirect::{RedirectService, redirect_routes};
pub use routes::api_routes;
