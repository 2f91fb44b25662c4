//! City search: OpenWeatherMap direct geocoding, each hit enriched with a
//! live temperature.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use skywatch_core::{ApiConfig, Language};
use tracing::instrument;

use crate::country;
use crate::provider::{truncate_body, OpenWeatherClient};
use crate::types::{CitySearchResult, Coordinate, WeatherError};

/// Geocoding candidates requested and returned
pub const SEARCH_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
struct GeoHit {
    name: String,
    country: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    local_names: HashMap<String, String>,
}

impl GeoHit {
    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    fn localized_name(&self, lang: Language) -> String {
        self.local_names
            .get(lang.iso_code())
            .filter(|n| !n.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| self.name.clone())
    }

    fn into_result(self, temperature: f64, lang: Language) -> CitySearchResult {
        CitySearchResult {
            name: self.localized_name(lang),
            country_display: country::display_country(&self.country, self.state.as_deref(), lang),
            flag: country::flag(&self.country),
            coordinate: self.coordinate(),
            country_code: self.country,
            temperature,
            is_top_result: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Arc<Client>,
    geo_url: String,
    api_key: String,
    weather: OpenWeatherClient,
}

impl GeocodingClient {
    /// Shares the HTTP client and credentials of `weather`.
    pub fn new(api: &ApiConfig, weather: OpenWeatherClient) -> Self {
        Self {
            client: weather.http(),
            geo_url: api.geo_url.trim_end_matches('/').to_string(),
            api_key: weather.api_key().to_string(),
            weather,
        }
    }

    /// Up to five matches for `query`, first one flagged as top result.
    ///
    /// A blank query yields an empty list without touching the network.
    /// Candidates whose temperature lookup fails are dropped.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &str) -> Result<Vec<CitySearchResult>, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let lang = self.weather.preferences().language();
        let hits = self.direct(query).await?;

        let coordinates: Vec<Coordinate> = hits.iter().map(GeoHit::coordinate).collect();
        let temperatures: Vec<Result<f64, WeatherError>> = stream::iter(coordinates)
            .map(|coordinate| self.weather.current_temperature(coordinate))
            .buffered(SEARCH_LIMIT)
            .collect()
            .await;

        let mut results: Vec<CitySearchResult> = hits
            .into_iter()
            .zip(temperatures)
            .filter_map(|(hit, temperature)| match temperature {
                Ok(t) => Some(hit.into_result(t, lang)),
                Err(e) => {
                    tracing::debug!("Dropping search hit {}: {}", hit.name, e);
                    None
                }
            })
            .take(SEARCH_LIMIT)
            .collect();

        if let Some(first) = results.first_mut() {
            first.is_top_result = true;
        }

        tracing::debug!(count = results.len(), "City search complete");
        Ok(results)
    }

    async fn direct(&self, query: &str) -> Result<Vec<GeoHit>, WeatherError> {
        let url = format!("{}/direct", self.geo_url);
        let limit = SEARCH_LIMIT.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("limit", limit.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        parse_hits(&body)
    }
}

/// Parse the geocoding array, skipping entries that do not fit [`GeoHit`].
fn parse_hits(body: &str) -> Result<Vec<GeoHit>, WeatherError> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| WeatherError::Parse(format!("geocoding response: {}", e)))?;

    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<GeoHit>(value) {
            Ok(hit) => Some(hit),
            Err(e) => {
                tracing::debug!("Skipping malformed geocoding hit: {}", e);
                None
            }
        })
        .collect())
}
