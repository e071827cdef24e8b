use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GatewayError, convert};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(GatewayError::validation(format!(
                "latitude must be between -90 and 90, got {}",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(GatewayError::validation(format!(
                "longitude must be between -180 and 180, got {}",
                self.longitude
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// What the caller wants current conditions for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WeatherQuery {
    City { name: String, country: Option<String> },
    Coordinates(Coordinates),
}

impl WeatherQuery {
    pub fn city(name: impl Into<String>) -> Self {
        WeatherQuery::City { name: name.into(), country: None }
    }

    pub fn city_in(name: impl Into<String>, country: impl Into<String>) -> Self {
        WeatherQuery::City { name: name.into(), country: Some(country.into()) }
    }

    pub fn coordinates(latitude: f64, longitude: f64) -> Self {
        WeatherQuery::Coordinates(Coordinates::new(latitude, longitude))
    }

    /// Parse `"City"` or `"City,CC"`.
    pub fn parse(input: &str) -> Result<Self, GatewayError> {
        let (name, country) = match input.split_once(',') {
            Some((name, country)) => (name.trim(), Some(country.trim())),
            None => (input.trim(), None),
        };

        let query = WeatherQuery::City {
            name: name.to_string(),
            country: country.filter(|c| !c.is_empty()).map(str::to_string),
        };
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        match self {
            WeatherQuery::City { name, country } => {
                if name.trim().is_empty() {
                    return Err(GatewayError::validation("city name must not be empty"));
                }
                if country.as_deref().is_some_and(|c| c.trim().is_empty()) {
                    return Err(GatewayError::validation("country code must not be empty"));
                }
                Ok(())
            }
            WeatherQuery::Coordinates(coords) => coords.validate(),
        }
    }

    /// Normalized signature used as the cache key.
    pub fn cache_key(&self) -> String {
        match self {
            WeatherQuery::City { name, country: Some(country) } => {
                format!(
                    "city:{},{}",
                    name.trim().to_lowercase(),
                    country.trim().to_lowercase()
                )
            }
            WeatherQuery::City { name, country: None } => {
                format!("city:{}", name.trim().to_lowercase())
            }
            WeatherQuery::Coordinates(c) => {
                format!("coord:{:.2},{:.2}", key_degrees(c.latitude), key_degrees(c.longitude))
            }
        }
    }

    /// Human-readable description, used in messages and logs.
    pub fn subject(&self) -> String {
        match self {
            WeatherQuery::City { name, country: Some(country) } => {
                format!("{},{}", name.trim(), country.trim())
            }
            WeatherQuery::City { name, country: None } => name.trim().to_string(),
            WeatherQuery::Coordinates(c) => c.to_string(),
        }
    }
}

/// Round to two decimals, folding `-0.0` into `0.0`.
fn key_degrees(value: f64) -> f64 {
    (value * 100.0).round() / 100.0 + 0.0
}

impl std::fmt::Display for WeatherQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.subject())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: u32,
    /// Group such as "Rain" or "Clouds".
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl WeatherCondition {
    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}@2x.png", self.icon)
    }
}

/// Current conditions for one location, in canonical units (°C, m/s, m).
///
/// Other units are derived on demand and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub city_name: String,
    pub country_code: String,
    pub coordinates: Coordinates,
    pub temperature_celsius: f64,
    pub feels_like_celsius: f64,
    pub condition: WeatherCondition,
    /// 0..=100
    pub humidity: u8,
    /// 800..=1200 hPa
    pub pressure_hpa: u16,
    /// 0..=200 m/s
    pub wind_speed_mps: f64,
    /// [0, 360)
    pub wind_direction_deg: f64,
    /// 0..=50000 m
    pub visibility_meters: u32,
    /// The current-weather endpoint has no UV data; this stays 0 until a UV
    /// lookup is added.
    pub uv_index: f64,
    pub last_updated: DateTime<Utc>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

impl CurrentConditions {
    pub fn temperature_fahrenheit(&self) -> f64 {
        convert::celsius_to_fahrenheit(self.temperature_celsius)
    }

    pub fn feels_like_fahrenheit(&self) -> f64 {
        convert::celsius_to_fahrenheit(self.feels_like_celsius)
    }

    pub fn wind_speed_kmh(&self) -> f64 {
        convert::mps_to_kmh(self.wind_speed_mps)
    }

    pub fn wind_speed_mph(&self) -> f64 {
        convert::mps_to_mph(self.wind_speed_mps)
    }

    pub fn wind_compass(&self) -> &'static str {
        convert::compass_direction(self.wind_direction_deg)
    }

    pub fn visibility_km(&self) -> f64 {
        convert::meters_to_km(f64::from(self.visibility_meters))
    }

    pub fn visibility_miles(&self) -> f64 {
        convert::meters_to_miles(f64::from(self.visibility_meters))
    }

    pub fn location_name(&self) -> String {
        format!("{}, {}", self.city_name, self.country_code)
    }
}

/// One geocoding match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySearchResult {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub coordinates: Coordinates,
}

impl CitySearchResult {
    pub fn display_name(&self) -> String {
        match self.state.as_deref().filter(|s| !s.is_empty()) {
            Some(state) => format!("{}, {}, {}", self.name, state, self.country),
            None => format!("{}, {}", self.name, self.country),
        }
    }

    /// `name,country`, accepted back by [`WeatherQuery::parse`].
    pub fn search_key(&self) -> String {
        format!("{},{}", self.name, self.country)
    }

    pub fn query(&self) -> WeatherQuery {
        WeatherQuery::Coordinates(self.coordinates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parse_city_and_country() {
        let q = WeatherQuery::parse(" London , GB ").unwrap();
        assert_eq!(q, WeatherQuery::city_in("London", "GB"));
        assert_eq!(q.cache_key(), "city:london,gb");
    }

    #[test]
    fn parse_city_only() {
        let q = WeatherQuery::parse("Paris").unwrap();
        assert_eq!(q, WeatherQuery::city("Paris"));

        let q = WeatherQuery::parse("Paris,").unwrap();
        assert_eq!(q, WeatherQuery::city("Paris"));
    }

    #[test]
    fn parse_rejects_blank_city() {
        let err = WeatherQuery::parse("   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = WeatherQuery::parse(" ,GB").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn coordinates_out_of_range() {
        for (lat, lon) in [(90.1, 0.0), (-90.1, 0.0), (0.0, 180.5), (0.0, -181.0), (f64::NAN, 0.0)] {
            let err = WeatherQuery::coordinates(lat, lon).validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "({lat}, {lon})");
        }

        assert!(WeatherQuery::coordinates(90.0, -180.0).validate().is_ok());
        assert!(WeatherQuery::coordinates(-90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn cache_key_normalizes() {
        assert_eq!(WeatherQuery::city("  LonDon ").cache_key(), "city:london");
        assert_eq!(
            WeatherQuery::coordinates(51.50735, -0.12776).cache_key(),
            "coord:51.51,-0.13"
        );
        assert_eq!(
            WeatherQuery::coordinates(51.5074, -0.1278).cache_key(),
            WeatherQuery::coordinates(51.5071, -0.1281).cache_key()
        );
    }

    #[test]
    fn cache_key_treats_both_sides_of_zero_alike() {
        let west = WeatherQuery::coordinates(-0.001, -0.004).cache_key();
        let east = WeatherQuery::coordinates(0.001, 0.004).cache_key();

        assert_eq!(west, "coord:0.00,0.00");
        assert_eq!(west, east);
    }

    #[test]
    fn search_result_names() {
        let with_state = CitySearchResult {
            name: "Springfield".into(),
            country: "US".into(),
            state: Some("Illinois".into()),
            coordinates: Coordinates::new(39.8, -89.6),
        };
        assert_eq!(with_state.display_name(), "Springfield, Illinois, US");
        assert_eq!(with_state.search_key(), "Springfield,US");

        let without_state = CitySearchResult { state: None, ..with_state.clone() };
        assert_eq!(without_state.display_name(), "Springfield, US");

        let parsed = WeatherQuery::parse(&with_state.search_key()).unwrap();
        assert_eq!(parsed, WeatherQuery::city_in("Springfield", "US"));
    }
}
