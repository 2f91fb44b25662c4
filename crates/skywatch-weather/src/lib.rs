//! Weather service for SkyWatch
//!
//! Current conditions, forecast aggregation and city search backed by the
//! OpenWeatherMap API.

pub mod country;
pub mod forecast;
pub mod geocode;
pub mod provider;
pub mod types;

pub use geocode::GeocodingClient;
pub use provider::OpenWeatherClient;
pub use types::*;
