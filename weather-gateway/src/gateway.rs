//! The weather gateway: cache, then retry-wrapped upstream call, then mapping.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    GatewayError,
    cache::{CacheStats, TtlCache},
    config::GatewayConfig,
    error::{AttemptFailure, classify_status, truncate_body},
    model::{CitySearchResult, Coordinates, CurrentConditions, WeatherQuery},
    provider::{MAX_SEARCH_LIMIT, WeatherProvider, openweather},
    retry::{AttemptError, RetryPolicy},
    transport::{HttpTransport, ReqwestTransport},
};

/// Geocoding data barely changes, so it is cached far longer than weather.
pub const CITY_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Known-good location used by the health probe (London).
const HEALTH_CHECK_LOCATION: Coordinates = Coordinates { latitude: 51.5074, longitude: -0.1278 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayCacheStats {
    pub conditions: CacheStats,
    pub cities: CacheStats,
}

#[derive(Debug)]
pub struct WeatherGateway {
    config: GatewayConfig,
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
    conditions: TtlCache<CurrentConditions>,
    cities: TtlCache<Vec<CitySearchResult>>,
}

impl WeatherGateway {
    /// Build a gateway with a reqwest transport configured from `config`.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;

        let transport =
            ReqwestTransport::new(&config.transport_config()).map_err(|e| GatewayError::Unknown {
                message: format!("Failed to build HTTP client: {e}"),
                status: None,
            })?;

        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: GatewayConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        Ok(Self {
            retry: config.retry_policy(),
            config,
            transport,
            conditions: TtlCache::new(),
            cities: TtlCache::new(),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> GatewayCacheStats {
        GatewayCacheStats { conditions: self.conditions.stats(), cities: self.cities.stats() }
    }

    /// Sweep expired entries from both caches.
    pub fn purge_expired(&self) -> usize {
        self.conditions.purge_expired() + self.cities.purge_expired()
    }

    /// Issue the request under `retry`, classifying each response.
    async fn fetch<T, P>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        subject: &str,
        retry: RetryPolicy,
        cancel: &CancellationToken,
        parse: P,
    ) -> Result<T, GatewayError>
    where
        T: Send,
        P: Fn(&str) -> Result<T, GatewayError> + Sync,
    {
        let transport = &self.transport;
        let parse = &parse;

        retry
            .run(cancel, move |attempt| async move {
                tracing::debug!(attempt = attempt + 1, url, "calling upstream");

                let response = transport.get(url, query).await.map_err(|e| {
                    if e.is_network() {
                        AttemptError::Retryable(AttemptFailure::Transport(e))
                    } else {
                        AttemptError::Fatal(GatewayError::Unknown {
                            message: format!("Weather API request failed: {e}"),
                            status: None,
                        })
                    }
                })?;

                if response.is_success() {
                    return parse(&response.body).map_err(|err| match err {
                        GatewayError::MalformedResponse { message, .. } => {
                            AttemptError::Fatal(GatewayError::MalformedResponse {
                                message,
                                status: Some(response.status),
                            })
                        }
                        other => AttemptError::Fatal(other),
                    });
                }

                if let Some(err) = classify_status(response.status, &response.body, subject) {
                    return Err(AttemptError::Fatal(err));
                }

                Err(AttemptError::Retryable(AttemptFailure::Status {
                    status: response.status,
                    body: truncate_body(&response.body),
                }))
            })
            .await
    }
}

fn search_cache_key(text: &str, limit: usize) -> String {
    format!("search:{}:{}", text.trim().to_lowercase(), limit)
}

#[async_trait]
impl WeatherProvider for WeatherGateway {
    #[tracing::instrument(skip_all, fields(query = %query))]
    async fn get_current_conditions(
        &self,
        query: &WeatherQuery,
        cancel: &CancellationToken,
    ) -> Result<CurrentConditions, GatewayError> {
        query.validate()?;

        let key = query.cache_key();
        if self.config.cache_enabled {
            if let Some(hit) = self.conditions.get(&key) {
                tracing::debug!(%key, "weather cache hit");
                return Ok(hit);
            }
            tracing::debug!(%key, "weather cache miss");
        }

        let (url, pairs) = openweather::current_weather_request(&self.config, query);
        let units = self.config.units;
        let fallback = match query {
            WeatherQuery::Coordinates(c) => Some(*c),
            WeatherQuery::City { .. } => None,
        };

        let result = self
            .fetch(&url, &pairs, &query.subject(), self.retry, cancel, |body| {
                openweather::map_current(body, units, fallback)
            })
            .await;

        match result {
            Ok(conditions) => {
                if self.config.cache_enabled {
                    self.conditions.insert(key, conditions.clone(), self.config.cache_ttl());
                }
                tracing::info!(city = %conditions.city_name, "current conditions fetched");
                Ok(conditions)
            }
            Err(err) => {
                tracing::warn!(kind = %err.kind(), error = %err, "current conditions failed");
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(text = %text, limit = limit))]
    async fn search_cities(
        &self,
        text: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<CitySearchResult>, GatewayError> {
        if text.trim().is_empty() {
            return Err(GatewayError::validation("search text must not be empty"));
        }
        if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
            return Err(GatewayError::validation(format!(
                "limit must be between 1 and {MAX_SEARCH_LIMIT}, got {limit}"
            )));
        }

        let key = search_cache_key(text, limit);
        if self.config.cache_enabled {
            if let Some(hit) = self.cities.get(&key) {
                tracing::debug!(%key, "city cache hit");
                return Ok(hit);
            }
            tracing::debug!(%key, "city cache miss");
        }

        let (url, pairs) = openweather::geocoding_request(&self.config, text, limit);
        let result = self
            .fetch(&url, &pairs, text.trim(), self.retry, cancel, openweather::map_cities)
            .await;

        match result {
            Ok(cities) => {
                if self.config.cache_enabled {
                    self.cities.insert(key, cities.clone(), CITY_CACHE_TTL);
                }
                tracing::info!(matches = cities.len(), "city search completed");
                Ok(cities)
            }
            Err(err) => {
                tracing::warn!(kind = %err.kind(), error = %err, "city search failed");
                Err(err)
            }
        }
    }

    async fn is_healthy(&self) -> bool {
        let query = WeatherQuery::Coordinates(HEALTH_CHECK_LOCATION);
        let (url, pairs) = openweather::current_weather_request(&self.config, &query);
        let units = self.config.units;

        let result = self
            .fetch(
                &url,
                &pairs,
                &query.subject(),
                RetryPolicy::no_retry(),
                &CancellationToken::new(),
                |body| openweather::map_current(body, units, Some(HEALTH_CHECK_LOCATION)).map(|_| ()),
            )
            .await;

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(kind = %err.kind(), error = %err, "health check failed");
                false
            }
        }
    }
}
