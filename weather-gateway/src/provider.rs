use async_trait::async_trait;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use crate::{
    GatewayError,
    model::{CitySearchResult, CurrentConditions, WeatherQuery},
};

pub mod openweather;

/// Largest number of geocoding matches a caller may ask for.
pub const MAX_SEARCH_LIMIT: usize = 10;

/// In-process interface the surrounding application talks to.
///
/// Each call is independent; callers may run many of them concurrently.
/// Cancelling `cancel` stops an in-flight call with [`GatewayError::Cancelled`].
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_current_conditions(
        &self,
        query: &WeatherQuery,
        cancel: &CancellationToken,
    ) -> Result<CurrentConditions, GatewayError>;

    /// Geocode free text into at most `limit` (1..=10) matches.
    async fn search_cities(
        &self,
        text: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<CitySearchResult>, GatewayError>;

    /// One lightweight upstream call; every failure collapses to `false`.
    async fn is_healthy(&self) -> bool;
}
