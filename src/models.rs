//! Data models for readings and raised alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---

/// The four monitored metrics. Stored as lowercase text in the `alerts` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Metric {
    Soil,
    Light,
    Temperature,
    Humidity,
}

impl Metric {
    // ---
    pub const ALL: [Metric; 4] = [
        Metric::Soil,
        Metric::Light,
        Metric::Temperature,
        Metric::Humidity,
    ];

    /// Human-readable name used in alert and report messages.
    pub fn label(self) -> &'static str {
        // ---
        match self {
            Metric::Soil => "soil moisture",
            Metric::Light => "light level",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }

    /// Measurement unit suffix ("" for raw analog counts).
    pub fn unit(self) -> &'static str {
        // ---
        match self {
            Metric::Soil | Metric::Light => "",
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
        }
    }

    /// Format a value of this metric for messages: raw counts as integers,
    /// temperature/humidity with one decimal.
    pub fn format_value(self, value: f64) -> String {
        // ---
        match self {
            Metric::Soil | Metric::Light => format!("{value:.0}"),
            Metric::Temperature | Metric::Humidity => format!("{value:.1}"),
        }
    }
}

/// Alert urgency tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

// ---

/// Ingestion payload for one sensor sample. The device firmware sends the
/// temperature field as `temp`, so both spellings are accepted.
#[derive(Debug, Deserialize)]
pub struct NewReading {
    // ---
    pub soil: i32,
    pub light: i32,
    #[serde(alias = "temp")]
    pub temperature: f32,
    pub humidity: f32,
}

impl NewReading {
    /// Reject payloads that are structurally numeric but not meaningful:
    /// non-finite floats or negative raw analog counts.
    pub fn validate(&self) -> Result<(), String> {
        // ---
        if !self.temperature.is_finite() {
            return Err("temperature must be a finite number".into());
        }
        if !self.humidity.is_finite() {
            return Err("humidity must be a finite number".into());
        }
        if self.soil < 0 || self.light < 0 {
            return Err("soil and light are raw analog counts and cannot be negative".into());
        }
        Ok(())
    }
}

/// One stored sensor sample. `recorded_at` is assigned by the store at
/// insertion and is the authoritative ordering key.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Reading {
    // ---
    pub id: Uuid,
    pub soil: i32,
    pub light: i32,
    pub temperature: f32,
    pub humidity: f32,
    pub recorded_at: DateTime<Utc>,
}

impl Reading {
    /// A reading is evaluable only if every metric field carries a usable
    /// number. Other writers share the table, so this is re-checked here and
    /// not only at the ingestion endpoint.
    pub fn is_valid(&self) -> bool {
        // ---
        self.temperature.is_finite()
            && self.humidity.is_finite()
            && self.soil >= 0
            && self.light >= 0
    }

    /// The value of a single metric as `f64` for evaluation and statistics.
    pub fn value(&self, metric: Metric) -> f64 {
        // ---
        match metric {
            Metric::Soil => self.soil as f64,
            Metric::Light => self.light as f64,
            Metric::Temperature => self.temperature as f64,
            Metric::Humidity => self.humidity as f64,
        }
    }
}

/// One raised out-of-band event. `reading_id` is a relation to the triggering
/// reading, not an owning foreign key.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Alert {
    // ---
    pub id: Uuid,
    pub reading_id: Uuid,
    pub metric: Metric,
    pub severity: Severity,
    pub value: f64,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
}
