use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use skywatch_core::{Language, NetworkError, ReqwestErrorExt};

/// Coordinates closer than this (degrees, both axes) name the same place.
pub const COORDINATE_EPSILON: f64 = 0.01;

/// Geographic position; the only stable identity of a city.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Fuzzy equality: provider coordinates for one city drift by rounding.
    pub fn approx_eq(&self, other: &Coordinate) -> bool {
        (self.latitude - other.latitude).abs() < COORDINATE_EPSILON
            && (self.longitude - other.longitude).abs() < COORDINATE_EPSILON
    }
}

/// 8-point compass direction the wind blows from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl WindDirection {
    const ALL: [WindDirection; 8] = [
        WindDirection::North,
        WindDirection::NorthEast,
        WindDirection::East,
        WindDirection::SouthEast,
        WindDirection::South,
        WindDirection::SouthWest,
        WindDirection::West,
        WindDirection::NorthWest,
    ];

    /// `round(degrees / 45) mod 8`
    pub fn from_degrees(degrees: f64) -> Self {
        let index = ((degrees / 45.0).round() as i64).rem_euclid(8) as usize;
        Self::ALL[index]
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
        }
    }

    pub fn label(&self, lang: Language) -> &'static str {
        match lang {
            Language::English => self.abbreviation(),
            Language::Korean => match self {
                Self::North => "북풍",
                Self::NorthEast => "북동풍",
                Self::East => "동풍",
                Self::SouthEast => "남동풍",
                Self::South => "남풍",
                Self::SouthWest => "남서풍",
                Self::West => "서풍",
                Self::NorthWest => "북서풍",
            },
        }
    }
}

/// Current weather snapshot. Replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub city_name: String,
    /// ISO-3166-1 alpha-2
    pub country_code: String,
    pub coordinate: Coordinate,
    pub description: String,
    pub icon: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub wind_direction: WindDirection,
    /// Kilometers, one decimal
    pub visibility_km: f64,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CurrentConditions {
    /// Time between sunrise and sunset; zero if the provider reports them inverted.
    pub fn daylight(&self) -> chrono::Duration {
        (self.sunset - self.sunrise).max(chrono::Duration::zero())
    }

    /// "<label> <h>h <m>m"
    pub fn daylight_text(&self, lang: Language) -> String {
        let daylight = self.daylight();
        format!(
            "{} {}h {}m",
            lang.daylight(),
            daylight.num_hours(),
            daylight.num_minutes() % 60
        )
    }
}

/// One raw 3-hour forecast point as returned by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub instant: DateTime<Utc>,
    pub temperature: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub icon: String,
    pub description: String,
    /// Probability of precipitation, 0.0 to 1.0
    pub precipitation: f64,
}

/// Hourly forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySample {
    pub instant: DateTime<Utc>,
    pub temperature: f64,
    pub icon: String,
    /// 0 to 100
    pub precipitation_probability: u8,
    pub is_current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayLabel {
    Today,
    Tomorrow,
    Weekday(Weekday),
}

impl DayLabel {
    pub fn text(&self, lang: Language) -> &'static str {
        match self {
            DayLabel::Today => lang.today(),
            DayLabel::Tomorrow => lang.tomorrow(),
            DayLabel::Weekday(day) => lang.weekday(*day),
        }
    }
}

impl std::fmt::Display for DayLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text(Language::English))
    }
}

/// Daily forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub label: DayLabel,
    pub temp_max: f64,
    pub temp_min: f64,
    pub icon: String,
    pub description: String,
    /// 0 to 100, worst case over the day
    pub precipitation_probability: u8,
    pub is_today: bool,
    /// Position of this day's maximum within the window's min..max range
    pub temperature_bar_ratio: f64,
}

/// Complete weather data bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentConditions,
    pub hourly: Vec<HourlySample>,
    pub daily: Vec<DailySummary>,
}

/// Geocoding candidate enriched with a live temperature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySearchResult {
    /// Localized name when the provider has one
    pub name: String,
    /// "<country>" or "<country> · <state>"
    pub country_display: String,
    pub country_code: String,
    pub flag: String,
    pub temperature: f64,
    pub coordinate: Coordinate,
    pub is_top_result: bool,
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Weather API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty location query")]
    EmptyQuery,
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        WeatherError::Network(e.into_network_error())
    }
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Network(e) => e.user_message(),
            WeatherError::Status { status: 401, .. } => {
                "Weather API key is invalid. Check settings."
            }
            WeatherError::Status { status: 404, .. } => "Location not found. Check and try again.",
            WeatherError::Status { .. } => "Weather service error. Please try again.",
            WeatherError::Parse(_) => "Weather data could not be read. Please try again.",
            WeatherError::EmptyQuery => "Enter a city name.",
        }
    }
}

/// Display glyph for an OpenWeatherMap icon code such as "02d" or "10n".
pub fn icon_glyph(icon: &str) -> &'static str {
    let night = icon.ends_with('n');
    match icon.get(..2) {
        Some("01") if night => "🌙",
        Some("01") => "☀️",
        Some("02") if night => "🌙",
        Some("02") => "🌤",
        Some("03") => "⛅",
        Some("04") => "☁️",
        Some("09") | Some("10") => "🌧",
        Some("11") => "⛈",
        Some("13") => "❄️",
        Some("50") => "🌫",
        _ if icon.is_empty() => "❓",
        _ => "🌤",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_coordinate_within_epsilon() {
        let a = Coordinate::new(37.50, 127.00);
        let b = Coordinate::new(37.505, 126.998);
        assert!(a.approx_eq(&b));
        assert!(b.approx_eq(&a));
    }

    #[test]
    fn test_coordinate_outside_epsilon_on_one_axis() {
        let a = Coordinate::new(37.50, 127.00);
        assert!(!a.approx_eq(&Coordinate::new(37.52, 127.00)));
        assert!(!a.approx_eq(&Coordinate::new(37.50, 126.98)));
    }

    #[test]
    fn test_wind_direction_cardinal_points() {
        assert_eq!(WindDirection::from_degrees(0.0), WindDirection::North);
        assert_eq!(WindDirection::from_degrees(90.0), WindDirection::East);
        assert_eq!(WindDirection::from_degrees(180.0), WindDirection::South);
        assert_eq!(WindDirection::from_degrees(270.0), WindDirection::West);
    }

    #[test]
    fn test_wind_direction_rounding_and_wrap() {
        assert_eq!(WindDirection::from_degrees(22.0), WindDirection::North);
        assert_eq!(WindDirection::from_degrees(23.0), WindDirection::NorthEast);
        assert_eq!(WindDirection::from_degrees(337.0), WindDirection::North);
        assert_eq!(WindDirection::from_degrees(360.0), WindDirection::North);
        assert_eq!(WindDirection::from_degrees(315.0), WindDirection::NorthWest);
    }

    #[test]
    fn test_wind_direction_labels() {
        assert_eq!(WindDirection::NorthEast.label(Language::English), "NE");
        assert_eq!(WindDirection::NorthEast.label(Language::Korean), "북동풍");
    }

    #[test]
    fn test_daylight_text() {
        let conditions = CurrentConditions {
            city_name: "Seoul".into(),
            country_code: "KR".into(),
            coordinate: Coordinate::new(37.57, 126.98),
            description: "clear sky".into(),
            icon: "01d".into(),
            temperature: 20.0,
            feels_like: 19.0,
            temp_min: 15.0,
            temp_max: 24.0,
            humidity: 40,
            wind_speed: 2.0,
            wind_direction: WindDirection::West,
            visibility_km: 10.0,
            sunrise: Utc.with_ymd_and_hms(2026, 5, 1, 20, 30, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2026, 5, 2, 10, 15, 0).unwrap(),
            updated_at: Utc::now(),
        };
        assert_eq!(conditions.daylight_text(Language::English), "Daylight 13h 45m");
        assert_eq!(conditions.daylight_text(Language::Korean), "낮 13h 45m");
    }

    #[test]
    fn test_day_label_display() {
        assert_eq!(DayLabel::Today.to_string(), "Today");
        assert_eq!(DayLabel::Weekday(Weekday::Fri).to_string(), "Fri");
        assert_eq!(DayLabel::Tomorrow.text(Language::Korean), "내일");
    }

    #[test]
    fn test_icon_glyph() {
        assert_eq!(icon_glyph("01d"), "☀️");
        assert_eq!(icon_glyph("01n"), "🌙");
        assert_eq!(icon_glyph("10d"), "🌧");
        assert_eq!(icon_glyph(""), "❓");
        assert_eq!(icon_glyph("99x"), "🌤");
    }

    #[test]
    fn test_weather_error_user_messages() {
        let err = WeatherError::Status {
            status: 401,
            message: "Invalid API key".into(),
        };
        assert!(err.user_message().contains("API key"));
        assert!(WeatherError::Parse("x".into()).user_message().contains("could not be read"));
    }
}
