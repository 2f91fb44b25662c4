use anyhow::Result;
use skywatch_core::Config;
use skywatch_services::App;
use skywatch_weather::icon_glyph;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    skywatch_core::init()?;

    let (config, _warnings) = Config::load_validated()?;
    let city = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.default_city.clone());

    let mut app = App::new(config)?;
    app.start();

    tracing::info!("SkyWatch application started");

    let home = app.home().clone();
    home.load_by_name(&city).await;
    let state = home.state();
    let lang = app.preferences().language();

    match &state.report {
        Some(report) => {
            let current = &report.current;
            println!(
                "{} {} {:.1}{}  {}",
                icon_glyph(&current.icon),
                state.display_name.as_deref().unwrap_or(&current.city_name),
                current.temperature,
                state.temperature_unit,
                current.description
            );
            println!(
                "  humidity {}%  wind {:.1} {} {}  visibility {:.1} km",
                current.humidity,
                current.wind_speed,
                state.wind_speed_unit,
                current.wind_direction.label(lang),
                current.visibility_km
            );
            println!("  {}", state.daylight_text);

            println!();
            for hour in &report.hourly {
                println!(
                    "  {}  {} {:.0}{}  {}%",
                    hour.instant.with_timezone(&chrono::Local).format("%H:%M"),
                    icon_glyph(&hour.icon),
                    hour.temperature,
                    state.temperature_unit,
                    hour.precipitation_probability
                );
            }

            println!();
            for day in &report.daily {
                println!(
                    "  {:<6} {} {:.0}/{:.0}{}  {}%",
                    day.label.text(lang),
                    icon_glyph(&day.icon),
                    day.temp_max,
                    day.temp_min,
                    state.temperature_unit,
                    day.precipitation_probability
                );
            }
        }
        None => {
            eprintln!(
                "{}",
                state
                    .error_message
                    .as_deref()
                    .unwrap_or("No weather data available.")
            );
        }
    }

    app.favorites().refresh_all().await;
    let favorites = app.favorites().favorites();
    if !favorites.is_empty() {
        println!();
        for favorite in &favorites {
            let temperature = favorite
                .temperature
                .map(|t| format!("{:.0}{}", t, state.temperature_unit))
                .unwrap_or_else(|| lang.placeholder().to_string());
            println!(
                "  {} {} {}{}",
                favorite.flag,
                favorite.name,
                temperature,
                if favorite.is_active { " *" } else { "" }
            );
        }
    }

    // Graceful shutdown
    app.shutdown().await;

    Ok(())
}
