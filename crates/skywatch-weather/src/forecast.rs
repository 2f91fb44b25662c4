//! Forecast aggregation: turns the provider's flat list of 3-hour samples
//! into the hourly strip and the per-day summaries shown on the home screen.
//!
//! Pure functions, no I/O. The time zone is a parameter so callers decide
//! what "local" means (the gateway passes `chrono::Local`).

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate, TimeZone, Timelike};

use crate::types::{DailySummary, DayLabel, ForecastSample, HourlySample};

/// Maximum number of entries in the hourly strip
pub const HOURLY_LIMIT: usize = 6;

/// Local hours whose icon best represents a day
const DAYTIME_HOURS: RangeInclusive<u32> = 9..=18;

/// Ratio used when every day shares the same temperature bounds
const NEUTRAL_RATIO: f64 = 0.5;

/// Earliest [`HOURLY_LIMIT`] samples, first one flagged current.
pub fn hourly(samples: &[ForecastSample]) -> Vec<HourlySample> {
    chronological(samples)
        .into_iter()
        .take(HOURLY_LIMIT)
        .enumerate()
        .map(|(index, sample)| HourlySample {
            instant: sample.instant,
            temperature: sample.temperature,
            icon: sample.icon.clone(),
            precipitation_probability: precipitation_percent(sample.precipitation),
            is_current: index == 0,
        })
        .collect()
}

/// One summary per local calendar date in `tz`, ascending.
pub fn daily<Tz: TimeZone>(
    samples: &[ForecastSample],
    today: NaiveDate,
    tz: &Tz,
) -> Vec<DailySummary> {
    let mut buckets: BTreeMap<NaiveDate, Vec<&ForecastSample>> = BTreeMap::new();
    for sample in chronological(samples) {
        let date = sample.instant.with_timezone(tz).date_naive();
        buckets.entry(date).or_default().push(sample);
    }

    let mut days: Vec<DailySummary> = buckets
        .into_iter()
        .filter_map(|(date, bucket)| summarize(date, &bucket, today, tz))
        .collect();

    apply_bar_ratios(&mut days);
    days
}

fn summarize<Tz: TimeZone>(
    date: NaiveDate,
    bucket: &[&ForecastSample],
    today: NaiveDate,
    tz: &Tz,
) -> Option<DailySummary> {
    let first = bucket.first()?;

    let temp_max = bucket
        .iter()
        .map(|s| s.temp_max)
        .fold(f64::NEG_INFINITY, f64::max);
    let temp_min = bucket
        .iter()
        .map(|s| s.temp_min)
        .fold(f64::INFINITY, f64::min);
    let precipitation = bucket
        .iter()
        .map(|s| s.precipitation)
        .fold(0.0, f64::max);

    // Night icons read badly as a day summary
    let representative = bucket
        .iter()
        .find(|s| DAYTIME_HOURS.contains(&s.instant.with_timezone(tz).hour()))
        .unwrap_or(first);

    Some(DailySummary {
        date,
        label: day_label(date, today),
        temp_max,
        temp_min,
        icon: representative.icon.clone(),
        description: representative.description.clone(),
        precipitation_probability: precipitation_percent(precipitation),
        is_today: date == today,
        temperature_bar_ratio: NEUTRAL_RATIO,
    })
}

fn apply_bar_ratios(days: &mut [DailySummary]) {
    let global_max = days.iter().map(|d| d.temp_max).fold(f64::NEG_INFINITY, f64::max);
    let global_min = days.iter().map(|d| d.temp_min).fold(f64::INFINITY, f64::min);
    let range = global_max - global_min;

    for day in days.iter_mut() {
        day.temperature_bar_ratio = if range > 0.0 {
            ((day.temp_max - global_min) / range).clamp(0.0, 1.0)
        } else {
            NEUTRAL_RATIO
        };
    }
}

fn day_label(date: NaiveDate, today: NaiveDate) -> DayLabel {
    if date == today {
        DayLabel::Today
    } else if Some(date) == today.succ_opt() {
        DayLabel::Tomorrow
    } else {
        DayLabel::Weekday(date.weekday())
    }
}

/// Provider probability (0.0..=1.0) to a whole percentage, truncated.
pub fn precipitation_percent(probability: f64) -> u8 {
    (probability * 100.0).clamp(0.0, 100.0) as u8
}

fn chronological(samples: &[ForecastSample]) -> Vec<&ForecastSample> {
    let mut ordered: Vec<&ForecastSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.instant);
    ordered
}
