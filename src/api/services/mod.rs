pub mod health;
pub mod lookup;

pub use health::{AppStartTime, HealthResponse, HealthService, health_routes};
pub use lookup::{FindCountryService, lookup_routes};
