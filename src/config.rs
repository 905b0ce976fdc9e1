//! Configuration loader for the `plantguard` engine.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Threshold bands live here so the evaluation logic
//! stays pure and independently testable: the evaluator receives a
//! [`Thresholds`] snapshot and never touches the environment itself.
//!
use std::env;

use anyhow::{anyhow, bail, Result};

use crate::models::Metric;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional float environment variable with a default value.
macro_rules! parse_env_f64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

// ---

/// Acceptable range for one metric. Values in `[low, high]` inclusive are
/// optimal; beyond `low - critical_margin` / `high + critical_margin` a
/// violation escalates from warning to critical.
#[derive(Debug, Clone, Copy)]
pub struct Band {
    pub low: f64,
    pub high: f64,
    pub critical_margin: f64,
}

/// Per-metric threshold bands.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub soil: Band,
    pub light: Band,
    pub temperature: Band,
    pub humidity: Band,
}

impl Thresholds {
    pub fn band(&self, metric: Metric) -> &Band {
        // ---
        match metric {
            Metric::Soil => &self.soil,
            Metric::Light => &self.light,
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
        }
    }
}

/// Defaults match the plant's documented healthy ranges; every value is
/// deployment-tunable through the environment.
impl Default for Thresholds {
    fn default() -> Self {
        // ---
        Thresholds {
            soil: Band {
                low: 1800.0,
                high: 2600.0,
                critical_margin: 300.0,
            },
            light: Band {
                low: 800.0,
                high: 1800.0,
                critical_margin: 400.0,
            },
            temperature: Band {
                low: 24.0,
                high: 35.0,
                critical_margin: 5.0,
            },
            humidity: Band {
                low: 40.0,
                high: 80.0,
                critical_margin: 15.0,
            },
        }
    }
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Outbound webhook for alert/report notifications. When unset,
    /// notifications are logged instead of delivered.
    pub webhook_url: Option<String>,

    /// Weather collaborator endpoint for the watering recommendation.
    /// When unset, reports omit the recommendation.
    pub weather_url: Option<String>,

    /// Per-metric low/high/critical-margin bands.
    pub thresholds: Thresholds,

    /// Minimum seconds between two alerts for the same metric.
    pub cooldown_secs: u32,

    /// Trailing window covered by one report run.
    pub report_window_hours: u32,

    /// Relative tolerance for the rising/falling/stable classification.
    pub trend_tolerance: f64,

    /// Whether a failed cooldown lookup may be treated as "no recent
    /// alerts" instead of aborting the evaluation.
    pub alert_fail_open: bool,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `ALERT_WEBHOOK_URL` – notification webhook (default: unset, log only)
/// - `WEATHER_API_URL` – weather outlook endpoint (default: unset)
/// - `ALERT_COOLDOWN_SECS` – per-metric alert cooldown (default: 1800)
/// - `REPORT_WINDOW_HOURS` – report window span (default: 24)
/// - `TREND_TOLERANCE` – relative trend tolerance (default: 0.05)
/// - `ALERT_FAIL_OPEN` – `true` to evaluate without cooldown history when
///   the lookup fails (default: false)
/// - `{SOIL,LIGHT,TEMP,HUMIDITY}_{LOW,HIGH,CRITICAL_MARGIN}` – band overrides
///
/// Returns an error if any variable is malformed or a band is inverted.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);

    let webhook_url = env::var("ALERT_WEBHOOK_URL").ok().filter(|v| !v.is_empty());
    let weather_url = env::var("WEATHER_API_URL").ok().filter(|v| !v.is_empty());

    let defaults = Thresholds::default();
    let thresholds = Thresholds {
        soil: band_from_env("SOIL", defaults.soil)?,
        light: band_from_env("LIGHT", defaults.light)?,
        temperature: band_from_env("TEMP", defaults.temperature)?,
        humidity: band_from_env("HUMIDITY", defaults.humidity)?,
    };

    let cooldown_secs = parse_env_u32!("ALERT_COOLDOWN_SECS", 1800);
    let report_window_hours = parse_env_u32!("REPORT_WINDOW_HOURS", 24);
    let trend_tolerance = parse_env_f64!("TREND_TOLERANCE", 0.05);

    let alert_fail_open = matches!(
        env::var("ALERT_FAIL_OPEN").as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    );

    if !(trend_tolerance > 0.0) {
        bail!("TREND_TOLERANCE must be positive, got {trend_tolerance}");
    }

    Ok(Config {
        db_url,
        db_pool_max,
        webhook_url,
        weather_url,
        thresholds,
        cooldown_secs,
        report_window_hours,
        trend_tolerance,
        alert_fail_open,
    })
}

/// Read one metric's band from `{prefix}_LOW`, `{prefix}_HIGH` and
/// `{prefix}_CRITICAL_MARGIN`, falling back to the built-in defaults.
fn band_from_env(prefix: &str, default: Band) -> Result<Band> {
    // ---
    let band = Band {
        low: parse_env_f64!(format!("{prefix}_LOW"), default.low),
        high: parse_env_f64!(format!("{prefix}_HIGH"), default.high),
        critical_margin: parse_env_f64!(format!("{prefix}_CRITICAL_MARGIN"), default.critical_margin),
    };

    if band.low >= band.high {
        bail!(
            "{prefix} band is inverted: low {} must be below high {}",
            band.low,
            band.high
        );
    }
    if band.critical_margin < 0.0 {
        bail!("{prefix}_CRITICAL_MARGIN cannot be negative");
    }

    Ok(band)
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        // Mask the password in the database URL for security
        let masked_db_url = if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                )
            } else {
                self.db_url.clone()
            }
        } else {
            self.db_url.clone()
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL        : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX         : {}", self.db_pool_max);
        tracing::info!(
            "  ALERT_WEBHOOK_URL   : {}",
            if self.webhook_url.is_some() { "set" } else { "unset (log only)" }
        );
        tracing::info!(
            "  WEATHER_API_URL     : {}",
            if self.weather_url.is_some() { "set" } else { "unset" }
        );
        tracing::info!("  ALERT_COOLDOWN_SECS : {}", self.cooldown_secs);
        tracing::info!("  REPORT_WINDOW_HOURS : {}", self.report_window_hours);
        tracing::info!("  TREND_TOLERANCE     : {}", self.trend_tolerance);
        tracing::info!("  ALERT_FAIL_OPEN     : {}", self.alert_fail_open);
        for metric in Metric::ALL {
            let band = self.thresholds.band(metric);
            tracing::info!(
                "  band {:<12}: {}..{} (critical margin {})",
                metric.label(),
                band.low,
                band.high,
                band.critical_margin
            );
        }
    }
}
