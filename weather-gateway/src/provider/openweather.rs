//! OpenWeather wire format: request construction and response mapping.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    GatewayError,
    config::{GatewayConfig, Units},
    convert,
    model::{CitySearchResult, Coordinates, CurrentConditions, WeatherCondition, WeatherQuery},
};

const UNKNOWN_COUNTRY: &str = "Unknown";

pub(crate) type QueryPairs = Vec<(&'static str, String)>;

pub(crate) fn current_weather_request(
    config: &GatewayConfig,
    query: &WeatherQuery,
) -> (String, QueryPairs) {
    let url = format!("{}/weather", config.base_url.trim_end_matches('/'));

    let mut pairs: QueryPairs = match query {
        WeatherQuery::City { name, country: Some(country) } => {
            vec![("q", format!("{},{}", name.trim(), country.trim()))]
        }
        WeatherQuery::City { name, country: None } => vec![("q", name.trim().to_string())],
        WeatherQuery::Coordinates(c) => {
            vec![("lat", c.latitude.to_string()), ("lon", c.longitude.to_string())]
        }
    };

    pairs.push(("appid", config.api_key.clone()));
    pairs.push(("units", config.units.as_str().to_string()));
    pairs.push(("lang", config.language.clone()));

    (url, pairs)
}

pub(crate) fn geocoding_request(config: &GatewayConfig, text: &str, limit: usize) -> (String, QueryPairs) {
    let url = format!("{}/direct", config.geo_base_url.trim_end_matches('/'));
    let pairs = vec![
        ("q", text.trim().to_string()),
        ("limit", limit.to_string()),
        ("appid", config.api_key.clone()),
    ];
    (url, pairs)
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: u32,
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

/// Every block is optional here so that missing required data can be
/// reported precisely instead of as a generic parse error.
#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    dt: Option<i64>,
    coord: Option<OwCoord>,
    main: Option<OwMain>,
    weather: Option<Vec<OwWeather>>,
    wind: Option<OwWind>,
    sys: Option<OwSys>,
    visibility: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwGeoCity {
    name: String,
    country: String,
    state: Option<String>,
    lat: f64,
    lon: f64,
}

/// Map a current-weather payload to the domain model.
///
/// `units` must be the unit system the request asked for; values are
/// normalized to °C and m/s. `fallback` supplies coordinates when the payload
/// has no `coord` block; without either the payload is malformed.
pub fn map_current(
    body: &str,
    units: Units,
    fallback: Option<Coordinates>,
) -> Result<CurrentConditions, GatewayError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::malformed(format!("Failed to parse weather JSON: {e}")))?;

    let city_name = parsed
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| GatewayError::malformed("weather response has no city name"))?;

    let main = parsed
        .main
        .ok_or_else(|| GatewayError::malformed("weather response has no main block"))?;

    let condition = parsed
        .weather
        .and_then(|w| w.into_iter().next())
        .map(|w| WeatherCondition {
            id: w.id,
            main: w.main,
            description: w.description,
            icon: w.icon,
        })
        .ok_or_else(|| GatewayError::malformed("weather response has no weather conditions"))?;

    let (country_code, sunrise, sunset) = match parsed.sys {
        Some(sys) => (
            sys.country.filter(|c| !c.trim().is_empty()).unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
            sys.sunrise.and_then(unix_to_utc),
            sys.sunset.and_then(unix_to_utc),
        ),
        None => (UNKNOWN_COUNTRY.to_string(), None, None),
    };

    let (wind_speed, wind_deg) = parsed.wind.map(|w| (w.speed, w.deg)).unwrap_or((0.0, 0.0));

    let coordinates = parsed
        .coord
        .map(|c| Coordinates::new(c.lat, c.lon))
        .or(fallback)
        .ok_or_else(|| GatewayError::malformed("weather response has no coordinates"))?;

    Ok(CurrentConditions {
        city_name,
        country_code,
        coordinates,
        temperature_celsius: to_celsius(main.temp, units),
        feels_like_celsius: to_celsius(main.feels_like, units),
        condition,
        humidity: main.humidity.round().clamp(0.0, 100.0) as u8,
        pressure_hpa: main.pressure.round().clamp(800.0, 1200.0) as u16,
        wind_speed_mps: to_mps(wind_speed, units).clamp(0.0, 200.0),
        wind_direction_deg: convert::normalize_degrees(wind_deg),
        visibility_meters: parsed.visibility.unwrap_or(0.0).round().clamp(0.0, 50_000.0) as u32,
        uv_index: 0.0,
        last_updated: parsed.dt.and_then(unix_to_utc).unwrap_or_else(Utc::now),
        sunrise,
        sunset,
    })
}

/// Map a geocoding payload (a JSON array) to search results.
pub fn map_cities(body: &str) -> Result<Vec<CitySearchResult>, GatewayError> {
    let parsed: Vec<OwGeoCity> = serde_json::from_str(body)
        .map_err(|e| GatewayError::malformed(format!("Failed to parse geocoding JSON: {e}")))?;

    Ok(parsed
        .into_iter()
        .map(|c| CitySearchResult {
            name: c.name,
            country: c.country,
            state: c.state.filter(|s| !s.is_empty()),
            coordinates: Coordinates::new(c.lat, c.lon),
        })
        .collect())
}

fn to_celsius(value: f64, units: Units) -> f64 {
    match units {
        Units::Metric => convert::round1(value),
        Units::Imperial => convert::fahrenheit_to_celsius(value),
        Units::Standard => convert::kelvin_to_celsius(value),
    }
}

fn to_mps(value: f64, units: Units) -> f64 {
    match units {
        Units::Imperial => convert::mph_to_mps(value),
        Units::Metric | Units::Standard => value,
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}
