pub mod app;
pub mod bus;
pub mod favorites;
pub mod home;
pub mod listener;
pub mod search;
pub mod settings;
pub mod store;

pub use app::App;
pub use bus::{EventBus, FavoriteInput, Message, MessageKind, SelectedCity, SettingsChange, Subscription};
pub use favorites::{FavoriteCity, FavoritesCoordinator};
pub use home::{HomeCoordinator, HomeState};
pub use listener::{follow_up, spawn_listener, FollowUp, ListenerHandle};
pub use search::{SearchCoordinator, RECENT_SEARCH_LIMIT};
pub use settings::SettingsCoordinator;
pub use store::{FavoritesStore, JsonFavoritesStore, JsonSettingsStore, SettingsStore};
