//! Unit and language changes.
//!
//! The only writer of [`SharedPreferences`]. Other components learn about a
//! change solely through [`Message::SettingsChanged`].

use std::sync::Arc;

use skywatch_core::{Language, Preferences, SharedPreferences, UnitSystem};

use crate::bus::{EventBus, Message, SettingsChange};
use crate::store::SettingsStore;

pub struct SettingsCoordinator {
    preferences: SharedPreferences,
    store: Arc<dyn SettingsStore>,
    bus: EventBus,
}

impl std::fmt::Debug for SettingsCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCoordinator")
            .field("preferences", &self.preferences.snapshot())
            .finish()
    }
}

impl SettingsCoordinator {
    pub fn new(preferences: SharedPreferences, store: Arc<dyn SettingsStore>, bus: EventBus) -> Self {
        Self {
            preferences,
            store,
            bus,
        }
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences.snapshot()
    }

    /// Returns false when `units` is already current.
    pub fn change_unit(&self, units: UnitSystem) -> bool {
        if self.preferences.units() == units {
            return false;
        }
        let updated = self.preferences.update(|p| p.units = units);
        self.commit(updated, SettingsChange::Unit(units));
        true
    }

    /// Returns false when `lang` is already current.
    pub fn change_language(&self, lang: Language) -> bool {
        if self.preferences.language() == lang {
            return false;
        }
        let updated = self.preferences.update(|p| p.lang = lang);
        self.commit(updated, SettingsChange::Language(lang));
        true
    }

    pub fn toggle_unit(&self) -> UnitSystem {
        let next = self.preferences.units().toggled();
        self.change_unit(next);
        next
    }

    fn commit(&self, updated: Preferences, change: SettingsChange) {
        if let Err(e) = self.store.save(&updated) {
            tracing::warn!("Failed to save settings: {}", e);
        }
        tracing::info!(reason = change.reason(), "Settings changed");
        self.bus.publish(Message::SettingsChanged(change));
    }
}
