//! OpenWeatherMap client: current conditions plus the 5-day/3-hour forecast.
//!
//! Responses are parsed into strict structs. A missing or malformed field
//! fails the whole fetch; no half-filled [`CurrentConditions`] ever leaves
//! this module.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use skywatch_core::{ApiConfig, Preferences, SharedPreferences};
use tracing::instrument;

use crate::forecast;
use crate::types::{
    Coordinate, CurrentConditions, ForecastSample, WeatherError, WeatherReport, WindDirection,
};

const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    icon: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    deg: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    coord: OwCoord,
    weather: Vec<OwCondition>,
    main: OwMain,
    wind: OwWind,
    visibility: f64,
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwForecastMain,
    weather: Vec<OwCondition>,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwTemperatureMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwTemperatureResponse {
    main: OwTemperatureMain,
}

impl OwCurrentResponse {
    fn into_conditions(self) -> Result<CurrentConditions, WeatherError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Parse("current weather has no condition".into()))?;

        Ok(CurrentConditions {
            city_name: self.name,
            country_code: self.sys.country,
            coordinate: Coordinate::new(self.coord.lat, self.coord.lon),
            description: condition.description,
            icon: condition.icon,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            temp_min: self.main.temp_min,
            temp_max: self.main.temp_max,
            humidity: self.main.humidity,
            wind_speed: self.wind.speed,
            wind_direction: WindDirection::from_degrees(self.wind.deg),
            visibility_km: meters_to_km(self.visibility),
            sunrise: unix_to_utc(self.sys.sunrise)?,
            sunset: unix_to_utc(self.sys.sunset)?,
            updated_at: Utc::now(),
        })
    }
}

impl OwForecastResponse {
    fn into_samples(self) -> Result<Vec<ForecastSample>, WeatherError> {
        self.list
            .into_iter()
            .map(|entry| {
                let condition = entry.weather.into_iter().next().ok_or_else(|| {
                    WeatherError::Parse(format!("forecast entry {} has no condition", entry.dt))
                })?;
                Ok(ForecastSample {
                    instant: unix_to_utc(entry.dt)?,
                    temperature: entry.main.temp,
                    temp_min: entry.main.temp_min,
                    temp_max: entry.main.temp_max,
                    icon: condition.icon,
                    description: condition.description,
                    precipitation: entry.pop,
                })
            })
            .collect()
    }
}

/// Where to fetch weather for
#[derive(Debug, Clone)]
enum Place {
    Name(String),
    At(Coordinate),
}

impl Place {
    fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Place::Name(name) => vec![("q", name.clone())],
            Place::At(c) => vec![("lat", c.latitude.to_string()), ("lon", c.longitude.to_string())],
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    key_configured: bool,
    preferences: SharedPreferences,
}

impl OpenWeatherClient {
    pub fn new(api: &ApiConfig, preferences: SharedPreferences) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(api.timeout()).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key: api.api_key.clone(),
            key_configured: api.is_configured(),
            preferences,
        })
    }

    /// False for an empty or placeholder key.
    pub fn has_api_key(&self) -> bool {
        self.key_configured
    }

    pub fn preferences(&self) -> &SharedPreferences {
        &self.preferences
    }

    pub(crate) fn http(&self) -> Arc<Client> {
        self.client.clone()
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Current conditions and aggregated forecast for a city name.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_by_name(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(WeatherError::EmptyQuery);
        }
        self.fetch_report(Place::Name(city.to_string())).await
    }

    /// Current conditions and aggregated forecast at a coordinate.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_by_coordinate(
        &self,
        coordinate: Coordinate,
    ) -> Result<WeatherReport, WeatherError> {
        self.fetch_report(Place::At(coordinate)).await
    }

    /// Current conditions only (favorites refresh).
    pub async fn current_by_coordinate(
        &self,
        coordinate: Coordinate,
    ) -> Result<CurrentConditions, WeatherError> {
        let prefs = self.preferences.snapshot();
        let response: OwCurrentResponse = self
            .get_json("weather", &Place::At(coordinate), &prefs)
            .await?;
        response.into_conditions()
    }

    /// Temperature only (search result enrichment).
    pub async fn current_temperature(&self, coordinate: Coordinate) -> Result<f64, WeatherError> {
        let prefs = self.preferences.snapshot();
        let response: OwTemperatureResponse = self
            .get_json("weather", &Place::At(coordinate), &prefs)
            .await?;
        Ok(response.main.temp)
    }

    async fn fetch_report(&self, place: Place) -> Result<WeatherReport, WeatherError> {
        // One snapshot so both halves use the same units and language
        let prefs = self.preferences.snapshot();

        let (current, forecast_response) = tokio::try_join!(
            self.get_json::<OwCurrentResponse>("weather", &place, &prefs),
            self.get_json::<OwForecastResponse>("forecast", &place, &prefs),
        )?;

        let current = current.into_conditions()?;
        let samples = forecast_response.into_samples()?;
        let today = Local::now().date_naive();

        tracing::debug!(
            city = %current.city_name,
            samples = samples.len(),
            "Fetched weather"
        );

        Ok(WeatherReport {
            current,
            hourly: forecast::hourly(&samples),
            daily: forecast::daily(&samples, today, &Local),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        place: &Place,
        prefs: &Preferences,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut query = place.query();
        query.push(("appid", self.api_key.clone()));
        query.push(("units", prefs.units.api_tag().to_string()));
        query.push(("lang", prefs.lang.api_tag().to_string()));

        let response = self.client.get(&url).query(&query).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!("OpenWeatherMap {} returned {}", endpoint, status);
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| WeatherError::Parse(format!("{} response: {}", endpoint, e)))
    }
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| WeatherError::Parse(format!("timestamp out of range: {}", ts)))
}

/// Meters to kilometers, one decimal
/// One decimal, halves to even: 9250 m is 9.2 km.
fn meters_to_km(meters: f64) -> f64 {
    (meters / 100.0).round_ties_even() / 10.0
}

pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
