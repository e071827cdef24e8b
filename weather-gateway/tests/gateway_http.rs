//! End-to-end tests of the gateway over real HTTP against a mock upstream.

use tokio_util::sync::CancellationToken;
use weather_gateway::{
    ErrorKind, GatewayConfig, Units, WeatherGateway, WeatherProvider, WeatherQuery,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        base_url: format!("{}/data/2.5", server.uri()),
        geo_base_url: format!("{}/geo/1.0", server.uri()),
        max_retries: 2,
        retry_delay_ms: 10,
        timeout_secs: 5,
        ..GatewayConfig::with_api_key("test_key")
    }
}

fn london_json() -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": -0.1257, "lat": 51.5085},
        "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
        "main": {"temp": 15.0, "feels_like": 14.3, "humidity": 81, "pressure": 1009},
        "visibility": 9000,
        "wind": {"speed": 5.0, "deg": 270},
        "dt": 1_700_000_000,
        "sys": {"country": "GB", "sunrise": 1_699_946_000, "sunset": 1_699_979_000},
        "name": "London"
    })
}

#[tokio::test]
async fn test_current_conditions_by_city() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "London,GB"))
        .and(query_param("appid", "test_key"))
        .and(query_param("units", "metric"))
        .and(query_param("lang", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = WeatherGateway::new(config_for(&mock_server)).unwrap();
    let cancel = CancellationToken::new();
    let query = WeatherQuery::parse("London,GB").unwrap();

    let conditions = gateway.get_current_conditions(&query, &cancel).await.unwrap();
    assert_eq!(conditions.city_name, "London");
    assert_eq!(conditions.country_code, "GB");
    assert_eq!(conditions.temperature_fahrenheit(), 59.0);
    assert_eq!(conditions.wind_compass(), "W");
    assert_eq!(conditions.condition.description, "light rain");

    // Served from cache; the mock's expect(1) verifies no second request.
    let cached = gateway.get_current_conditions(&query, &cancel).await.unwrap();
    assert_eq!(cached, conditions);
    assert_eq!(gateway.cache_stats().conditions.hits, 1);
}

#[tokio::test]
async fn test_current_conditions_by_coordinates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "51.5085"))
        .and(query_param("lon", "-0.1257"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json({
            let mut body = london_json();
            body["main"]["temp"] = serde_json::json!(59.0);
            body
        }))
        .mount(&mock_server)
        .await;

    let cfg = GatewayConfig { units: Units::Imperial, ..config_for(&mock_server) };
    let gateway = WeatherGateway::new(cfg).unwrap();

    let conditions = gateway
        .get_current_conditions(&WeatherQuery::coordinates(51.5085, -0.1257), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(conditions.temperature_celsius, 15.0);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"cod": "404", "message": "city not found"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = WeatherGateway::new(config_for(&mock_server)).unwrap();
    let err = gateway
        .get_current_conditions(&WeatherQuery::city("Atlantis"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CityNotFound);
    assert!(err.to_string().contains("Atlantis"));
}

#[tokio::test]
async fn test_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = WeatherGateway::new(config_for(&mock_server)).unwrap();
    let err = gateway
        .get_current_conditions(&WeatherQuery::city("London"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
}

#[tokio::test]
async fn test_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "60"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = WeatherGateway::new(config_for(&mock_server)).unwrap();
    let err = gateway
        .get_current_conditions(&WeatherQuery::city("London"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RateLimited);
}

#[tokio::test]
async fn test_server_error_exhausts_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let gateway = WeatherGateway::new(config_for(&mock_server)).unwrap();
    let err = gateway
        .get_current_conditions(&WeatherQuery::city("London"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NetworkFailure);
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_malformed_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "London"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = WeatherGateway::new(config_for(&mock_server)).unwrap();
    let err = gateway
        .get_current_conditions(&WeatherQuery::city("London"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[tokio::test]
async fn test_search_cities() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Springfield"))
        .and(query_param("limit", "3"))
        .and(query_param("appid", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "Springfield", "country": "US", "state": "Illinois", "lat": 39.7990, "lon": -89.6440},
            {"name": "Springfield", "country": "US", "state": "Missouri", "lat": 37.2153, "lon": -93.2982}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = WeatherGateway::new(config_for(&mock_server)).unwrap();
    let cancel = CancellationToken::new();

    let cities = gateway.search_cities("Springfield", 3, &cancel).await.unwrap();
    assert_eq!(cities.len(), 2);
    assert_eq!(cities[1].display_name(), "Springfield, Missouri, US");

    let again = gateway.search_cities("springfield", 3, &cancel).await.unwrap();
    assert_eq!(again, cities);
}

#[tokio::test]
async fn test_health_check() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "51.5074"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_json()))
        .mount(&mock_server)
        .await;

    let gateway = WeatherGateway::new(config_for(&mock_server)).unwrap();
    assert!(gateway.is_healthy().await);
}

#[tokio::test]
async fn test_health_check_unreachable_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = WeatherGateway::new(config_for(&mock_server)).unwrap();
    assert!(!gateway.is_healthy().await);
}

#[tokio::test]
async fn test_cancelled_before_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_json()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let gateway = WeatherGateway::new(config_for(&mock_server)).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = gateway
        .get_current_conditions(&WeatherQuery::city("London"), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}
