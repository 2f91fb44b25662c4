//! User preferences (unit system, language) and the shared handle through
//! which every gateway and coordinator reads them.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::i18n::Language;

/// Unit system requested from the provider (`units=` query parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn api_tag(self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub fn temperature_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
        }
    }

    pub fn wind_speed_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "m/s",
            UnitSystem::Imperial => "mph",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }
}

impl FromStr for UnitSystem {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            other => Err(ConfigError::Invalid(format!("unknown unit system '{}'", other))),
        }
    }
}

/// Persisted as `{"units": "...", "lang": "..."}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Preferences {
    #[serde(default)]
    pub units: UnitSystem,
    #[serde(default)]
    pub lang: Language,
}

/// Cloneable handle to the process-wide preferences.
///
/// Readers take a [`Preferences`] snapshot per operation. The settings
/// coordinator is the only writer.
#[derive(Debug, Clone, Default)]
pub struct SharedPreferences {
    inner: Arc<RwLock<Preferences>>,
}

impl SharedPreferences {
    pub fn new(initial: Preferences) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn snapshot(&self) -> Preferences {
        *self.inner.read()
    }

    pub fn units(&self) -> UnitSystem {
        self.inner.read().units
    }

    pub fn language(&self) -> Language {
        self.inner.read().lang
    }

    /// Apply `f` and return the resulting snapshot.
    pub fn update(&self, f: impl FnOnce(&mut Preferences)) -> Preferences {
        let mut guard = self.inner.write();
        f(&mut guard);
        *guard
    }
}
