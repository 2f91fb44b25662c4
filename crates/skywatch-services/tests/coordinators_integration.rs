//! Integration tests for the coordinators against a mock weather API.

use std::sync::Arc;
use std::time::Duration;

use skywatch_core::{ApiConfig, Config, Preferences, SharedPreferences, UnitSystem};
use skywatch_services::{
    App, EventBus, FavoriteCity, FavoriteInput, FavoritesCoordinator, FavoritesStore,
    HomeCoordinator, JsonFavoritesStore, Message, SelectedCity,
};
use skywatch_weather::{CitySearchResult, Coordinate, OpenWeatherClient};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn current_json(name: &str, lat: f64, lon: f64, temp: f64, icon: &str) -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": lon, "lat": lat},
        "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": icon}],
        "main": {"temp": temp, "feels_like": temp, "temp_min": temp - 2.0, "temp_max": temp + 2.0, "humidity": 70},
        "visibility": 8000,
        "wind": {"speed": 4.0, "deg": 180},
        "sys": {"country": "KR", "sunrise": 1760044800, "sunset": 1760086800},
        "name": name
    })
}

fn forecast_json() -> serde_json::Value {
    let list: Vec<serde_json::Value> = (0..8i64)
        .map(|i| {
            serde_json::json!({
                "dt": 1760054400 + i * 3 * 3600,
                "main": {"temp": 10.0, "temp_min": 8.0, "temp_max": 12.0},
                "weather": [{"icon": "10d", "description": "light rain"}],
                "pop": 0.6
            })
        })
        .collect();
    serde_json::json!({ "list": list })
}

fn weather_client(server: &MockServer) -> OpenWeatherClient {
    let api = ApiConfig::with_base(&server.uri(), KEY);
    OpenWeatherClient::new(&api, SharedPreferences::new(Preferences::default())).unwrap()
}

fn favorite(name: &str, lat: f64, lon: f64, temperature: Option<f64>) -> FavoriteCity {
    FavoriteCity {
        name: name.to_string(),
        country_code: "KR".to_string(),
        flag: "🇰🇷".to_string(),
        coordinate: Coordinate::new(lat, lon),
        temperature,
        icon: None,
        is_active: false,
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_toggle_add_applies_fetched_weather() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "35.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Busan", 35.1, 129.04, 24.0, "10d")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFavoritesStore::new(dir.path().join("favorites.json")));
    let coordinator =
        FavoritesCoordinator::new(weather_client(&mock_server), store.clone(), EventBus::new());

    coordinator
        .toggle(FavoriteInput::SearchResult(CitySearchResult {
            name: "부산".to_string(),
            country_display: "대한민국".to_string(),
            country_code: "KR".to_string(),
            flag: "🇰🇷".to_string(),
            temperature: 20.0,
            coordinate: Coordinate::new(35.1, 129.04),
            is_top_result: true,
        }))
        .await;

    let favorites = coordinator.favorites();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].name, "부산");
    assert_eq!(favorites[0].temperature, Some(24.0));
    assert_eq!(favorites[0].icon.as_deref(), Some("10d"));

    // Persisted after the weather was applied
    assert_eq!(store.load(), favorites);
}

#[tokio::test]
async fn test_refresh_all_updates_and_keeps_stale_on_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "35.1"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Seoul", 37.57, 126.98, 16.0, "04d")))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFavoritesStore::new(dir.path().join("favorites.json")));
    store
        .save(&[
            favorite("Seoul", 37.57, 126.98, Some(10.0)),
            favorite("Busan", 35.1, 129.04, Some(22.0)),
        ])
        .unwrap();

    let coordinator =
        FavoritesCoordinator::new(weather_client(&mock_server), store.clone(), EventBus::new());
    coordinator.refresh_all().await;

    let favorites = coordinator.favorites();
    assert_eq!(favorites[0].temperature, Some(16.0));
    assert_eq!(favorites[0].icon.as_deref(), Some("04d"));
    assert_eq!(favorites[1].temperature, Some(22.0));
    assert_eq!(store.load()[0].temperature, Some(16.0));
}

#[tokio::test]
async fn test_select_favorite_refreshes_daylight_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Seoul", 37.57, 126.98, 16.0, "01d")))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFavoritesStore::new(dir.path().join("favorites.json")));
    store
        .save(&[favorite("Seoul", 37.57, 126.98, None)])
        .unwrap();

    let coordinator =
        FavoritesCoordinator::new(weather_client(&mock_server), store, EventBus::new());
    let seoul = coordinator.favorites()[0].clone();

    let text = coordinator.select_favorite(&seoul).await;

    assert_eq!(text.as_deref(), Some("낮 11h 40m"));
    assert_eq!(coordinator.daylight_text().as_deref(), Some("낮 11h 40m"));
    assert!(coordinator.favorites()[0].is_active);
}

#[tokio::test]
async fn test_home_discards_superseded_load() {
    let mock_server = MockServer::start().await;

    for endpoint in ["/weather", "/forecast"] {
        let slow_body = if endpoint == "/weather" {
            current_json("Slowtown", 1.0, 1.0, 5.0, "13d")
        } else {
            forecast_json()
        };
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("q", "Slowtown"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(slow_body)
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Fastville"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Fastville", 2.0, 2.0, 25.0, "01d")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("q", "Fastville"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
        .mount(&mock_server)
        .await;

    let home = HomeCoordinator::new(weather_client(&mock_server), EventBus::new());

    let (slow, fast) = tokio::join!(home.load_by_name("Slowtown"), home.load_by_name("Fastville"));

    assert!(!slow);
    assert!(fast);
    let state = home.state();
    assert_eq!(state.display_name.as_deref(), Some("Fastville"));
    assert_eq!(state.report.map(|r| r.current.temperature), Some(25.0));
    assert!(!state.has_error);
}

#[tokio::test]
async fn test_selected_city_keeps_display_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Jung-gu", 37.56, 126.99, 18.0, "02d")))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
        .mount(&mock_server)
        .await;

    let home = HomeCoordinator::new(weather_client(&mock_server), EventBus::new());
    home.load_city(SelectedCity {
        name: "서울".to_string(),
        country_code: "KR".to_string(),
        coordinate: Coordinate::new(37.56, 126.99),
    })
    .await;

    let state = home.state();
    assert_eq!(state.display_name.as_deref(), Some("서울"));
    assert_eq!(state.daylight_text, "낮 11h 40m");
    assert_eq!(state.report.map(|r| r.hourly.len()), Some(6));
}

#[tokio::test]
async fn test_app_routes_selection_and_unit_change_over_bus() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Seoul", 37.57, 126.98, 18.0, "01d")))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        api: ApiConfig::with_base(&mock_server.uri(), KEY),
        default_city: "Seoul".to_string(),
    };
    let mut app = App::new(config).unwrap();
    app.start();

    let result = CitySearchResult {
        name: "서울".to_string(),
        country_display: "대한민국".to_string(),
        country_code: "KR".to_string(),
        flag: "🇰🇷".to_string(),
        temperature: 18.0,
        coordinate: Coordinate::new(37.57, 126.98),
        is_top_result: true,
    };

    app.search().toggle_favorite(&result);
    wait_until(|| app.favorites().favorites().len() == 1).await;

    app.search().select(&result);
    let home = app.home().clone();
    wait_until(|| home.state().display_name.as_deref() == Some("서울")).await;
    wait_until(|| app.favorites().active().is_some()).await;

    assert!(app.settings().change_unit(UnitSystem::Imperial));
    wait_until(|| home.state().temperature_unit == "°F").await;

    let imperial_requests = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.query().is_some_and(|q| q.contains("units=imperial")))
        .count();
    assert!(imperial_requests >= 2);

    app.shutdown().await;
}

#[tokio::test]
async fn test_refresh_all_fetches_every_favorite_at_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_json("Seoul", 37.57, 126.98, 16.0, "04d"))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(12)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFavoritesStore::new(dir.path().join("favorites.json")));
    let stored: Vec<FavoriteCity> = (0..12)
        .map(|i| favorite(&format!("City{}", i), 30.0 + f64::from(i), 120.0, None))
        .collect();
    store.save(&stored).unwrap();

    let coordinator = FavoritesCoordinator::new(weather_client(&mock_server), store, EventBus::new());

    let started = std::time::Instant::now();
    coordinator.refresh_all().await;

    // A capped fan-out would need at least two rounds of the delay
    assert!(started.elapsed() < Duration::from_millis(950));
    assert!(coordinator
        .favorites()
        .iter()
        .all(|f| f.temperature == Some(16.0)));
}

#[tokio::test]
async fn test_rapid_bus_selections_show_latest_city() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_json("Slowtown", 1.0, 1.0, 5.0, "13d"))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Fastville", 2.0, 2.0, 25.0, "01d")))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
        .mount(&mock_server)
        .await;

    let bus = EventBus::new();
    let home = Arc::new(HomeCoordinator::new(weather_client(&mock_server), bus.clone()));
    let _listener = home.spawn_listener();

    for (name, lat) in [("Slowtown", 1.0), ("Fastville", 2.0)] {
        bus.publish(Message::CitySelected(SelectedCity {
            name: name.to_string(),
            country_code: "KR".to_string(),
            coordinate: Coordinate::new(lat, lat),
        }));
    }

    wait_until(|| home.state().display_name.as_deref() == Some("Fastville")).await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    let state = home.state();
    assert_eq!(state.display_name.as_deref(), Some("Fastville"));
    assert_eq!(state.report.map(|r| r.current.temperature), Some(25.0));
    assert!(!state.is_loading);
}
