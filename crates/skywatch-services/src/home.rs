//! Home screen state: the displayed city's report.
//!
//! Every load is stamped with a generation number. When loads overlap, only
//! the most recently started one may write its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use skywatch_core::Language;
use skywatch_weather::{OpenWeatherClient, WeatherError, WeatherReport};
use tracing::instrument;

use crate::bus::{EventBus, Message, MessageKind, SelectedCity};
use crate::listener::{follow_up, spawn_listener, FollowUp, ListenerHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct HomeState {
    pub report: Option<WeatherReport>,
    /// Name shown in the header; a selected city keeps its localized name
    pub display_name: Option<String>,
    pub is_loading: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
    pub temperature_unit: &'static str,
    pub wind_speed_unit: &'static str,
    pub daylight_text: String,
}

impl HomeState {
    fn empty(lang: Language) -> Self {
        Self {
            report: None,
            display_name: None,
            is_loading: false,
            has_error: false,
            error_message: None,
            temperature_unit: "°C",
            wind_speed_unit: "m/s",
            daylight_text: lang.placeholder().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
enum Request {
    Name(String),
    City(SelectedCity),
}

pub struct HomeCoordinator {
    weather: OpenWeatherClient,
    bus: EventBus,
    state: RwLock<HomeState>,
    last_request: Mutex<Option<Request>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for HomeCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeCoordinator")
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl HomeCoordinator {
    pub fn new(weather: OpenWeatherClient, bus: EventBus) -> Self {
        let prefs = weather.preferences().snapshot();
        let mut state = HomeState::empty(prefs.lang);
        state.temperature_unit = prefs.units.temperature_label();
        state.wind_speed_unit = prefs.units.wind_speed_label();

        Self {
            weather,
            bus,
            state: RwLock::new(state),
            last_request: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> HomeState {
        self.state.read().clone()
    }

    /// Returns true when this load's result was applied.
    #[instrument(skip(self), level = "info")]
    pub async fn load_by_name(&self, city: &str) -> bool {
        self.load(Request::Name(city.to_string())).await
    }

    /// Returns true when this load's result was applied.
    #[instrument(skip_all, fields(city = %city.name), level = "info")]
    pub async fn load_city(&self, city: SelectedCity) -> bool {
        self.load(Request::City(city)).await
    }

    /// Repeat the last load with current preferences.
    pub async fn refresh(&self) -> bool {
        let last = self.last_request.lock().clone();
        match last {
            Some(request) => self.load(request).await,
            None => {
                self.refresh_labels();
                false
            }
        }
    }

    async fn load(&self, request: Request) -> bool {
        let generation = self.begin(request.clone());
        self.complete(generation, request).await
    }

    /// Stamp `request` as the latest load and flag loading.
    fn begin(&self, request: Request) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock() = Some(request);
        self.state.write().is_loading = true;
        generation
    }

    /// Fetch and apply unless a newer load has begun meanwhile.
    async fn complete(&self, generation: u64, request: Request) -> bool {
        let (result, display_name) = match &request {
            Request::Name(name) => (self.weather.fetch_by_name(name).await, None),
            Request::City(city) => (
                self.weather.fetch_by_coordinate(city.coordinate).await,
                Some(city.name.clone()),
            ),
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Discarding superseded weather result");
            return false;
        }

        self.apply(result, display_name);
        true
    }

    fn apply(&self, result: Result<WeatherReport, WeatherError>, display_name: Option<String>) {
        let prefs = self.weather.preferences().snapshot();
        let mut state = self.state.write();
        state.is_loading = false;
        state.temperature_unit = prefs.units.temperature_label();
        state.wind_speed_unit = prefs.units.wind_speed_label();

        match result {
            Ok(report) => {
                state.daylight_text = report.current.daylight_text(prefs.lang);
                state.display_name =
                    Some(display_name.unwrap_or_else(|| report.current.city_name.clone()));
                state.report = Some(report);
                state.has_error = false;
                state.error_message = None;
            }
            Err(e) => {
                tracing::warn!("Weather load failed: {}", e);
                state.report = None;
                state.daylight_text = prefs.lang.placeholder().to_string();
                state.has_error = true;
                state.error_message = Some(e.user_message().to_string());
            }
        }
    }

    fn refresh_labels(&self) {
        let units = self.weather.preferences().units();
        let mut state = self.state.write();
        state.temperature_unit = units.temperature_label();
        state.wind_speed_unit = units.wind_speed_label();
    }

    /// Start the load a bus message asks for. The generation is taken here,
    /// inside `publish`, so the most recently published request wins.
    fn on_message(self: &Arc<Self>, message: &Message) -> Option<FollowUp> {
        let request = match message {
            Message::CitySelected(city) => Request::City(city.clone()),
            Message::SettingsChanged(change) => {
                tracing::debug!(reason = change.reason(), "Reloading home weather");
                let last = self.last_request.lock().clone();
                match last {
                    Some(request) => request,
                    None => {
                        self.refresh_labels();
                        return None;
                    }
                }
            }
            Message::ToggleFavorite(_) | Message::FavoritesChanged(_) => return None,
        };

        let generation = self.begin(request.clone());
        let coordinator = Arc::clone(self);
        follow_up(async move {
            coordinator.complete(generation, request).await;
        })
    }

    /// React to city selection and settings changes from the bus.
    pub fn spawn_listener(self: &Arc<Self>) -> ListenerHandle {
        let coordinator = Arc::downgrade(self);
        spawn_listener(
            "home",
            &self.bus,
            &[MessageKind::CitySelected, MessageKind::SettingsChanged],
            move |message| coordinator.upgrade()?.on_message(message),
        )
    }
}
