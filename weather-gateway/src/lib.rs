//! Core library behind the `weather` CLI.
//!
//! This crate defines:
//! - The weather gateway: cached, retrying access to the OpenWeather API
//! - Typed errors for every upstream failure mode
//! - Domain models (queries, current conditions, city search results) and unit conversions
//! - Configuration & the favorite-cities store
//!
//! It is used by `weather-cli`, but can also be embedded by other binaries or services.

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod favorites;
pub mod gateway;
pub mod model;
pub mod provider;
pub mod retry;
pub mod transport;

pub use cache::CacheStats;
pub use config::{Config, GatewayConfig, Units};
pub use error::{ErrorKind, GatewayError};
pub use favorites::{FavoriteCity, FavoritesStore, FileFavoritesStore};
pub use gateway::{GatewayCacheStats, WeatherGateway};
pub use model::{CitySearchResult, Coordinates, CurrentConditions, WeatherCondition, WeatherQuery};
pub use provider::WeatherProvider;
pub use retry::RetryPolicy;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportConfig, TransportError};
