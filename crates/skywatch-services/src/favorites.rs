//! Favorite cities: toggle, selection, periodic refresh.
//!
//! [`FavoritesCoordinator`] owns the favorite set. Everyone else sees copies
//! via [`Message::FavoritesChanged`] or [`FavoritesCoordinator::favorites`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use skywatch_weather::{country, Coordinate, CurrentConditions, OpenWeatherClient};
use tracing::instrument;

use crate::bus::{EventBus, FavoriteInput, Message, MessageKind, SelectedCity, SettingsChange};
use crate::listener::{follow_up, spawn_listener, FollowUp, ListenerHandle};
use crate::store::FavoritesStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCity {
    pub name: String,
    pub country_code: String,
    pub flag: String,
    pub coordinate: Coordinate,
    /// Last known temperature in the units of the last refresh
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Last known icon code
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

impl FavoriteCity {
    /// Same city if name and country agree, or the coordinates are within epsilon.
    pub fn matches(&self, name: &str, country_code: &str, coordinate: &Coordinate) -> bool {
        (self.name == name && self.country_code == country_code)
            || self.coordinate.approx_eq(coordinate)
    }

    fn apply(&mut self, current: &CurrentConditions) {
        self.temperature = Some(current.temperature);
        self.icon = Some(current.icon.clone());
    }
}

impl From<&FavoriteCity> for SelectedCity {
    fn from(city: &FavoriteCity) -> Self {
        SelectedCity {
            name: city.name.clone(),
            country_code: city.country_code.clone(),
            coordinate: city.coordinate,
        }
    }
}

/// Identity and seed values pulled out of a toggle input
struct Candidate {
    name: String,
    country_code: String,
    flag: String,
    coordinate: Coordinate,
    temperature: Option<f64>,
    icon: Option<String>,
}

impl From<FavoriteInput> for Candidate {
    fn from(input: FavoriteInput) -> Self {
        match input {
            FavoriteInput::SearchResult(r) => Candidate {
                name: r.name,
                country_code: r.country_code,
                flag: r.flag,
                coordinate: r.coordinate,
                temperature: Some(r.temperature),
                icon: None,
            },
            FavoriteInput::CurrentConditions(c) => Candidate {
                flag: country::flag(&c.country_code),
                name: c.city_name,
                country_code: c.country_code,
                coordinate: c.coordinate,
                temperature: Some(c.temperature),
                icon: Some(c.icon),
            },
            FavoriteInput::Favorite(f) => Candidate {
                name: f.name,
                country_code: f.country_code,
                flag: f.flag,
                coordinate: f.coordinate,
                temperature: f.temperature,
                icon: f.icon,
            },
        }
    }
}

impl Candidate {
    fn matches(&self, favorite: &FavoriteCity) -> bool {
        favorite.matches(&self.name, &self.country_code, &self.coordinate)
    }

    fn into_favorite(self) -> FavoriteCity {
        FavoriteCity {
            name: self.name,
            country_code: self.country_code,
            flag: self.flag,
            coordinate: self.coordinate,
            temperature: self.temperature,
            icon: self.icon,
            is_active: false,
        }
    }
}

pub struct FavoritesCoordinator {
    favorites: Mutex<Vec<FavoriteCity>>,
    /// Last fetched conditions of the active favorite
    active_conditions: Mutex<Option<CurrentConditions>>,
    weather: OpenWeatherClient,
    store: Arc<dyn FavoritesStore>,
    bus: EventBus,
}

impl std::fmt::Debug for FavoritesCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesCoordinator")
            .field("favorites", &self.favorites.lock().len())
            .finish()
    }
}

impl FavoritesCoordinator {
    /// Load the stored set. Extra active flags from storage are cleared.
    pub fn new(weather: OpenWeatherClient, store: Arc<dyn FavoritesStore>, bus: EventBus) -> Self {
        let mut favorites = store.load();
        let mut seen_active = false;
        for favorite in &mut favorites {
            if favorite.is_active {
                favorite.is_active = !seen_active;
                seen_active = true;
            }
        }
        tracing::info!("Loaded {} favorites", favorites.len());

        Self {
            favorites: Mutex::new(favorites),
            active_conditions: Mutex::new(None),
            weather,
            store,
            bus,
        }
    }

    pub fn favorites(&self) -> Vec<FavoriteCity> {
        self.favorites.lock().clone()
    }

    pub fn active(&self) -> Option<FavoriteCity> {
        self.favorites.lock().iter().find(|f| f.is_active).cloned()
    }

    /// Daylight text of the active favorite in the current language, once known
    pub fn daylight_text(&self) -> Option<String> {
        let lang = self.weather.preferences().language();
        self.active_conditions
            .lock()
            .as_ref()
            .map(|current| current.daylight_text(lang))
    }

    pub fn contains(&self, name: &str, country_code: &str, coordinate: &Coordinate) -> bool {
        self.favorites
            .lock()
            .iter()
            .any(|f| f.matches(name, country_code, coordinate))
    }

    /// Remove the matching favorite, or add a new inactive one and fetch its weather.
    #[instrument(skip_all, level = "info")]
    pub async fn toggle(&self, input: FavoriteInput) {
        if let Some(coordinate) = self.apply_toggle(input) {
            self.fill_new_favorite(coordinate).await;
        }
    }

    /// Add or remove without touching the network. Returns the coordinate of
    /// a newly added favorite.
    fn apply_toggle(&self, input: FavoriteInput) -> Option<Coordinate> {
        let candidate = Candidate::from(input);

        let added = {
            let mut favorites = self.favorites.lock();
            match favorites.iter().position(|f| candidate.matches(f)) {
                Some(index) => {
                    let removed = favorites.remove(index);
                    tracing::info!("Removed favorite {}", removed.name);
                    None
                }
                None => {
                    let favorite = candidate.into_favorite();
                    tracing::info!("Added favorite {}", favorite.name);
                    let coordinate = favorite.coordinate;
                    favorites.push(favorite);
                    Some(coordinate)
                }
            }
        };
        self.persist_and_publish();
        added
    }

    /// Replace a new favorite's seed values with fetched ones.
    async fn fill_new_favorite(&self, coordinate: Coordinate) {
        match self.weather.current_by_coordinate(coordinate).await {
            Ok(current) => {
                let applied = {
                    let mut favorites = self.favorites.lock();
                    match favorites
                        .iter_mut()
                        .find(|f| f.coordinate.approx_eq(&coordinate))
                    {
                        Some(favorite) => {
                            favorite.apply(&current);
                            true
                        }
                        // Removed again while the fetch was in flight
                        None => false,
                    }
                };
                if applied {
                    self.persist_and_publish();
                }
            }
            Err(e) => tracing::debug!("New favorite keeps seed values: {}", e),
        }
    }

    /// Make `city` the only active favorite, announce it, and refresh its
    /// daylight text. Returns the new daylight text when the fetch succeeds.
    #[instrument(skip_all, fields(city = %city.name), level = "info")]
    pub async fn select_favorite(&self, city: &FavoriteCity) -> Option<String> {
        let selected = SelectedCity::from(city);
        if !self.contains(&selected.name, &selected.country_code, &selected.coordinate) {
            tracing::warn!("Selected city {} is not a favorite", city.name);
            return None;
        }
        self.mark_active(&selected);
        self.bus.publish(Message::CitySelected(selected));

        match self.weather.current_by_coordinate(city.coordinate).await {
            Ok(current) => {
                let text = current.daylight_text(self.weather.preferences().language());
                *self.active_conditions.lock() = Some(current);
                Some(text)
            }
            Err(e) => {
                tracing::debug!("Daylight refresh failed: {}", e);
                None
            }
        }
    }

    /// Update every favorite's temperature and icon, all fetches in flight at once.
    ///
    /// Failed lookups keep the last known values. Skipped without an API key.
    #[instrument(skip_all, level = "info")]
    pub async fn refresh_all(&self) {
        if !self.weather.has_api_key() {
            tracing::debug!("No API key configured, skipping favorites refresh");
            return;
        }

        let coordinates: Vec<Coordinate> =
            self.favorites.lock().iter().map(|f| f.coordinate).collect();
        if coordinates.is_empty() {
            return;
        }

        let results: Vec<_> = stream::iter(coordinates.clone())
            .map(|coordinate| self.weather.current_by_coordinate(coordinate))
            .buffered(coordinates.len())
            .collect()
            .await;

        let mut active_conditions = None;
        let mut failures = 0usize;
        {
            let mut favorites = self.favorites.lock();
            for (coordinate, result) in coordinates.iter().zip(results) {
                let current = match result {
                    Ok(current) => current,
                    Err(e) => {
                        failures += 1;
                        tracing::debug!("Refresh failed at {:?}: {}", coordinate, e);
                        continue;
                    }
                };
                if let Some(favorite) = favorites
                    .iter_mut()
                    .find(|f| f.coordinate.approx_eq(coordinate))
                {
                    favorite.apply(&current);
                    if favorite.is_active {
                        active_conditions = Some(current);
                    }
                }
            }
        }

        if let Some(current) = active_conditions {
            *self.active_conditions.lock() = Some(current);
        }

        tracing::info!(
            total = coordinates.len(),
            failures,
            "Favorites refreshed"
        );
        self.persist_and_publish();
    }

    /// Mark the favorite matching `city` active and clear the rest.
    /// Returns whether any flag changed.
    fn mark_active(&self, city: &SelectedCity) -> bool {
        let changed = {
            let mut favorites = self.favorites.lock();
            let target = favorites
                .iter()
                .position(|f| f.matches(&city.name, &city.country_code, &city.coordinate));

            let mut changed = false;
            for (i, favorite) in favorites.iter_mut().enumerate() {
                let active = Some(i) == target;
                if favorite.is_active != active {
                    favorite.is_active = active;
                    changed = true;
                }
            }
            changed
        };

        if changed {
            *self.active_conditions.lock() = None;
            self.persist_and_publish();
        }
        changed
    }

    /// Apply a bus message. Runs inside `publish`; any fetch it needs is
    /// returned as a follow-up.
    fn on_message(self: &Arc<Self>, message: &Message) -> Option<FollowUp> {
        match message {
            Message::ToggleFavorite(input) => {
                let coordinate = self.apply_toggle(input.clone())?;
                let coordinator = Arc::clone(self);
                follow_up(async move { coordinator.fill_new_favorite(coordinate).await })
            }
            Message::SettingsChanged(SettingsChange::Unit(_)) => {
                let coordinator = Arc::clone(self);
                follow_up(async move { coordinator.refresh_all().await })
            }
            Message::CitySelected(city) => {
                self.mark_active(city);
                None
            }
            Message::SettingsChanged(SettingsChange::Language(_))
            | Message::FavoritesChanged(_) => None,
        }
    }

    /// React to toggles, unit changes and city selection from the bus.
    pub fn spawn_listener(self: &Arc<Self>) -> ListenerHandle {
        let coordinator = Arc::downgrade(self);
        spawn_listener(
            "favorites",
            &self.bus,
            &[
                MessageKind::ToggleFavorite,
                MessageKind::SettingsChanged,
                MessageKind::CitySelected,
            ],
            move |message| coordinator.upgrade()?.on_message(message),
        )
    }

    fn persist_and_publish(&self) {
        let snapshot = self.favorites();
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!("Failed to save favorites: {}", e);
        }
        self.bus.publish(Message::FavoritesChanged(snapshot));
    }
}
