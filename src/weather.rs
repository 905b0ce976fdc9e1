//! Optional weather collaborator for the daily report.
//!
//! When `WEATHER_API_URL` is configured, the reporter fetches a short outlook
//! and folds a watering recommendation into the summary. The collaborator is
//! strictly best-effort: any fetch or decode failure degrades to "no
//! recommendation" and never fails the report.

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::config::Thresholds;

// ---

/// Outlook for the next 24 hours as served by the weather endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherOutlook {
    /// Chance of precipitation, percent.
    pub precipitation_probability: f32,
    /// Expected daily high, °C.
    pub high_temperature_c: f32,
}

/// Fetch the outlook from the configured endpoint.
pub async fn fetch_outlook(url: &str) -> Result<WeatherOutlook> {
    // ---
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let outlook = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<WeatherOutlook>()
        .await?;

    Ok(outlook)
}

// ---

/// Precipitation chance at or above this is treated as "rain is coming".
const RAIN_PROBABILITY_PCT: f32 = 50.0;

/// Derive a watering recommendation from the outlook and the current soil
/// average. Pure function; the statistics themselves are never altered.
///
/// Only precipitation and heat produce advice. A quiet forecast yields
/// `None` even when the soil is trending dry, because without weather input
/// the alerting path already covers dryness.
pub fn watering_recommendation(
    outlook: &WeatherOutlook,
    soil_avg: Option<f64>,
    thresholds: &Thresholds,
) -> Option<String> {
    // ---
    let soil_avg = soil_avg?;
    let soil = &thresholds.soil;

    if outlook.precipitation_probability >= RAIN_PROBABILITY_PCT {
        return Some(format!(
            "rain likely ({:.0}% chance), hold off on watering",
            outlook.precipitation_probability
        ));
    }

    let heat_expected = f64::from(outlook.high_temperature_c) >= thresholds.temperature.high;
    let soil_on_dry_side = soil_avg < (soil.low + soil.high) / 2.0;
    if heat_expected && soil_on_dry_side {
        return Some(format!(
            "high heat expected ({:.0}°C) and soil is on the dry side, water early in the day",
            outlook.high_temperature_c
        ));
    }

    None
}
