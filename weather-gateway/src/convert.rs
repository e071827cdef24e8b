//! Unit conversions used by the domain model. All results are rounded to one
//! decimal place.

const KELVIN_OFFSET: f64 = 273.15;
const MPS_TO_KMH: f64 = 3.6;
const MPS_TO_MPH: f64 = 2.237;
const METERS_PER_MILE: f64 = 1609.344;

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    round1(kelvin - KELVIN_OFFSET)
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    round1(celsius * 9.0 / 5.0 + 32.0)
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    round1((fahrenheit - 32.0) * 5.0 / 9.0)
}

pub fn mps_to_kmh(mps: f64) -> f64 {
    round1(mps * MPS_TO_KMH)
}

pub fn mps_to_mph(mps: f64) -> f64 {
    round1(mps * MPS_TO_MPH)
}

/// Inverse of [`mps_to_mph`], kept at full precision so the canonical value
/// is not rounded twice.
pub fn mph_to_mps(mph: f64) -> f64 {
    mph / MPS_TO_MPH
}

pub fn meters_to_km(meters: f64) -> f64 {
    round1(meters / 1000.0)
}

pub fn meters_to_miles(meters: f64) -> f64 {
    round1(meters / METERS_PER_MILE)
}

/// Normalize any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if d >= 360.0 { 0.0 } else { d }
}

/// 16-point compass direction, "N" centred on 0°.
pub fn compass_direction(degrees: f64) -> &'static str {
    let index = (normalize_degrees(degrees) / 22.5).round() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}
