use std::sync::Arc;

use anyhow::Result;
use skywatch_core::{Config, SharedPreferences};
use skywatch_weather::{GeocodingClient, OpenWeatherClient};

use crate::bus::EventBus;
use crate::favorites::FavoritesCoordinator;
use crate::home::HomeCoordinator;
use crate::listener::ListenerHandle;
use crate::search::SearchCoordinator;
use crate::settings::SettingsCoordinator;
use crate::store::{FavoritesStore, JsonFavoritesStore, JsonSettingsStore, SettingsStore};

/// Wires gateways, coordinators and the bus together and owns their listeners.
pub struct App {
    config: Arc<Config>,
    bus: EventBus,
    preferences: SharedPreferences,
    favorites: Arc<FavoritesCoordinator>,
    home: Arc<HomeCoordinator>,
    settings: SettingsCoordinator,
    search: SearchCoordinator,
    listeners: Vec<ListenerHandle>,
}

impl App {
    /// Build with JSON stores under `config.data_dir`
    pub fn new(config: Config) -> Result<Self> {
        let favorites_store = Arc::new(JsonFavoritesStore::new(config.favorites_path()));
        let settings_store = Arc::new(JsonSettingsStore::new(config.settings_path()));
        Self::with_stores(config, favorites_store, settings_store)
    }

    pub fn with_stores(
        config: Config,
        favorites_store: Arc<dyn FavoritesStore>,
        settings_store: Arc<dyn SettingsStore>,
    ) -> Result<Self> {
        let preferences = SharedPreferences::new(settings_store.load());
        let bus = EventBus::new();

        let weather = OpenWeatherClient::new(&config.api, preferences.clone())?;
        let geocoder = GeocodingClient::new(&config.api, weather.clone());

        let favorites = Arc::new(FavoritesCoordinator::new(
            weather.clone(),
            favorites_store,
            bus.clone(),
        ));
        let home = Arc::new(HomeCoordinator::new(weather, bus.clone()));
        let settings = SettingsCoordinator::new(preferences.clone(), settings_store, bus.clone());
        let search = SearchCoordinator::new(geocoder, bus.clone());

        Ok(Self {
            config: Arc::new(config),
            bus,
            preferences,
            favorites,
            home,
            settings,
            search,
            listeners: Vec::new(),
        })
    }

    /// Start the bus listeners. Must run inside a tokio runtime.
    pub fn start(&mut self) {
        if !self.listeners.is_empty() {
            return;
        }
        self.listeners.push(self.favorites.spawn_listener());
        self.listeners.push(self.home.spawn_listener());

        tracing::info!("SkyWatch started with {} listeners", self.listeners.len());
    }

    /// Stop all listeners and wait for them to finish.
    pub async fn shutdown(&mut self) {
        tracing::info!("Shutting down SkyWatch");

        for listener in self.listeners.drain(..) {
            tracing::debug!("Stopping listener: {}", listener.name());
            listener.shutdown().await;
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn preferences(&self) -> &SharedPreferences {
        &self.preferences
    }

    pub fn favorites(&self) -> &Arc<FavoritesCoordinator> {
        &self.favorites
    }

    pub fn home(&self) -> &Arc<HomeCoordinator> {
        &self.home
    }

    pub fn settings(&self) -> &SettingsCoordinator {
        &self.settings
    }

    pub fn search(&self) -> &SearchCoordinator {
        &self.search
    }
}
