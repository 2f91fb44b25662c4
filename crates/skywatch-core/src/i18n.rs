//! Display language and the handful of labels the core formats itself.

use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// UI/provider language. Serialized as the OpenWeatherMap `lang` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[default]
    #[serde(rename = "kr")]
    Korean,
}

impl Language {
    /// Tag sent as `lang=` to the weather API.
    pub fn api_tag(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Korean => "kr",
        }
    }

    /// ISO 639-1 code, as used by geocoding `local_names`.
    pub fn iso_code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Korean => "ko",
        }
    }

    pub fn today(self) -> &'static str {
        match self {
            Language::English => "Today",
            Language::Korean => "오늘",
        }
    }

    pub fn tomorrow(self) -> &'static str {
        match self {
            Language::English => "Tomorrow",
            Language::Korean => "내일",
        }
    }

    pub fn weekday(self, day: Weekday) -> &'static str {
        match self {
            Language::English => match day {
                Weekday::Mon => "Mon",
                Weekday::Tue => "Tue",
                Weekday::Wed => "Wed",
                Weekday::Thu => "Thu",
                Weekday::Fri => "Fri",
                Weekday::Sat => "Sat",
                Weekday::Sun => "Sun",
            },
            Language::Korean => match day {
                Weekday::Mon => "월",
                Weekday::Tue => "화",
                Weekday::Wed => "수",
                Weekday::Thu => "목",
                Weekday::Fri => "금",
                Weekday::Sat => "토",
                Weekday::Sun => "일",
            },
        }
    }

    /// Prefix of the "<label> <h>h <m>m" daylight text.
    pub fn daylight(self) -> &'static str {
        match self {
            Language::English => "Daylight",
            Language::Korean => "낮",
        }
    }

    /// Shown in place of a time or duration that is not known yet.
    pub fn placeholder(self) -> &'static str {
        "--:--"
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::English),
            "kr" | "ko" => Ok(Language::Korean),
            other => Err(ConfigError::Invalid(format!("unknown language '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_tags() {
        assert_eq!(Language::Korean.api_tag(), "kr");
        assert_eq!(Language::Korean.iso_code(), "ko");
        assert_eq!(Language::English.api_tag(), "en");
    }

    #[test]
    fn test_parse_accepts_both_korean_codes() {
        assert_eq!("kr".parse::<Language>().unwrap(), Language::Korean);
        assert_eq!("KO".parse::<Language>().unwrap(), Language::Korean);
        assert_eq!(" en ".parse::<Language>().unwrap(), Language::English);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_serde_uses_api_tag() {
        assert_eq!(serde_json::to_string(&Language::Korean).unwrap(), "\"kr\"");
        let lang: Language = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(lang, Language::English);
    }

    #[test]
    fn test_weekday_labels() {
        assert_eq!(Language::English.weekday(Weekday::Wed), "Wed");
        assert_eq!(Language::Korean.weekday(Weekday::Sun), "일");
    }
}
