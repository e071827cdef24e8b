//! Plain-text rendering of gateway results.

use chrono::{DateTime, Local, Utc};
use std::fmt::Write;
use weather_gateway::{CitySearchResult, CurrentConditions, FavoriteCity, Units};

pub fn conditions(c: &CurrentConditions, units: Units) -> String {
    let mut out = String::new();

    let (temp, feels) = match units {
        Units::Imperial => (
            format!("{:.1}°F ({:.1}°C)", c.temperature_fahrenheit(), c.temperature_celsius),
            format!("{:.1}°F", c.feels_like_fahrenheit()),
        ),
        Units::Metric | Units::Standard => (
            format!("{:.1}°C ({:.1}°F)", c.temperature_celsius, c.temperature_fahrenheit()),
            format!("{:.1}°C", c.feels_like_celsius),
        ),
    };

    let _ = writeln!(out, "{} ({})", c.location_name(), c.coordinates);
    let _ = writeln!(out, "{}: {}", c.condition.main, c.condition.description);
    let _ = writeln!(out, "Temperature: {temp}, feels like {feels}");
    let _ = writeln!(out, "Humidity:    {}%", c.humidity);
    let _ = writeln!(out, "Pressure:    {} hPa", c.pressure_hpa);
    let _ = writeln!(
        out,
        "Wind:        {:.1} km/h ({:.1} mph) from {} ({:.0}°)",
        c.wind_speed_kmh(),
        c.wind_speed_mph(),
        c.wind_compass(),
        c.wind_direction_deg
    );
    let _ = writeln!(out, "Visibility:  {:.1} km ({:.1} mi)", c.visibility_km(), c.visibility_miles());
    let _ = writeln!(out, "Sunrise:     {}", local_time(c.sunrise));
    let _ = writeln!(out, "Sunset:      {}", local_time(c.sunset));
    let _ = write!(
        out,
        "Updated:     {}",
        c.last_updated.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );

    out
}

pub fn cities(cities: &[CitySearchResult]) -> String {
    if cities.is_empty() {
        return "No matching cities.".to_string();
    }

    cities
        .iter()
        .enumerate()
        .map(|(i, city)| {
            format!("{}. {}  [{}]  ({})", i + 1, city.display_name(), city.search_key(), city.coordinates)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn favorites(favorites: &[FavoriteCity]) -> String {
    if favorites.is_empty() {
        return "No favorite cities yet. Add one with `weather favorites add <city>`.".to_string();
    }

    favorites
        .iter()
        .map(|f| {
            format!(
                "{}  {}  last viewed {}",
                f.id,
                f.display_name(),
                f.last_accessed.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn local_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "n/a".to_string())
}
