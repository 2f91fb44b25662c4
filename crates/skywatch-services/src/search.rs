//! City search screen: results, recent queries, and hand-off to the bus.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use skywatch_weather::{CitySearchResult, GeocodingClient};

use crate::bus::{EventBus, FavoriteInput, Message, SelectedCity};

pub const RECENT_SEARCH_LIMIT: usize = 8;

pub struct SearchCoordinator {
    geocoder: GeocodingClient,
    bus: EventBus,
    results: RwLock<Vec<CitySearchResult>>,
    error_message: RwLock<Option<String>>,
    recent: Mutex<VecDeque<String>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for SearchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCoordinator")
            .field("results", &self.results.read().len())
            .field("recent", &self.recent.lock().len())
            .finish()
    }
}

impl SearchCoordinator {
    pub fn new(geocoder: GeocodingClient, bus: EventBus) -> Self {
        Self {
            geocoder,
            bus,
            results: RwLock::new(Vec::new()),
            error_message: RwLock::new(None),
            recent: Mutex::new(VecDeque::with_capacity(RECENT_SEARCH_LIMIT)),
            generation: AtomicU64::new(0),
        }
    }

    /// Run a search and return its results.
    ///
    /// Results are stored only if no newer search started meanwhile. A
    /// query with at least one result is remembered as a recent search.
    pub async fn search(&self, query: &str) -> Vec<CitySearchResult> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (results, error) = match self.geocoder.search(query).await {
            Ok(results) => (results, None),
            Err(e) => {
                tracing::warn!("City search failed: {}", e);
                (Vec::new(), Some(e.user_message().to_string()))
            }
        };

        if !results.is_empty() {
            self.remember(query);
        }

        if self.generation.load(Ordering::SeqCst) == generation {
            *self.results.write() = results.clone();
            *self.error_message.write() = error;
        } else {
            tracing::debug!(generation, "Discarding superseded search results");
        }

        results
    }

    pub fn results(&self) -> Vec<CitySearchResult> {
        self.results.read().clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error_message.read().clone()
    }

    /// Most recent first
    pub fn recent_searches(&self) -> Vec<String> {
        self.recent.lock().iter().cloned().collect()
    }

    pub fn clear_recent(&self) {
        self.recent.lock().clear();
    }

    /// Show `result` on the home screen.
    pub fn select(&self, result: &CitySearchResult) {
        self.bus.publish(Message::CitySelected(SelectedCity {
            name: result.name.clone(),
            country_code: result.country_code.clone(),
            coordinate: result.coordinate,
        }));
    }

    pub fn toggle_favorite(&self, result: &CitySearchResult) {
        self.bus
            .publish(Message::ToggleFavorite(FavoriteInput::SearchResult(result.clone())));
    }

    fn remember(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        let lowered = query.to_lowercase();

        let mut recent = self.recent.lock();
        recent.retain(|q| q.to_lowercase() != lowered);
        recent.push_front(query.to_string());
        recent.truncate(RECENT_SEARCH_LIMIT);
    }
}
