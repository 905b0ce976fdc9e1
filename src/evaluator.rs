//! Threshold evaluation for the most recent sensor reading.
//!
//! The evaluator is a pure function over a reading, the recent alert history
//! and a [`Thresholds`] snapshot. It classifies each metric against its band,
//! derives a severity from the critical margin, and suppresses repeats for
//! metrics that already alerted within the cooldown window. All persistence
//! and notification side effects belong to the trigger route, not here.

use chrono::Duration;

use crate::config::{Band, Thresholds};
use crate::models::{Alert, Metric, Reading, Severity};

// ---

/// Which side of the band a value fell out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Low,
    High,
}

/// A violation that survived cooldown suppression and should become a
/// persisted [`Alert`].
#[derive(Debug, Clone)]
pub struct PendingAlert {
    pub metric: Metric,
    pub severity: Severity,
    pub value: f64,
    pub message: String,
}

/// Outcome of one evaluation run.
#[derive(Debug)]
pub struct Evaluation {
    /// Violations found, including suppressed ones.
    pub detected: usize,
    /// Violations dropped by the cooldown.
    pub suppressed: usize,
    /// Alerts to persist and notify about.
    pub alerts: Vec<PendingAlert>,
}

impl Evaluation {
    /// One batched notification goes out iff at least one alert survived.
    pub fn notify(&self) -> bool {
        !self.alerts.is_empty()
    }
}

// ---

/// Evaluate `latest` against the threshold bands.
///
/// `recent` is the alert history within the cooldown horizon; membership is
/// decided by comparing `triggered_at` against `latest.recorded_at` rather
/// than wall-clock or arrival order. The caller guarantees `latest` passed
/// [`Reading::is_valid`].
pub fn evaluate(
    latest: &Reading,
    recent: &[Alert],
    thresholds: &Thresholds,
    cooldown: Duration,
) -> Evaluation {
    // ---
    let cutoff = latest.recorded_at - cooldown;

    let mut detected = 0;
    let mut alerts = Vec::new();

    for metric in Metric::ALL {
        let value = latest.value(metric);
        let band = thresholds.band(metric);

        let Some((severity, direction)) = classify(band, value) else {
            continue;
        };
        detected += 1;

        let in_cooldown = recent
            .iter()
            .any(|a| a.metric == metric && a.triggered_at > cutoff);
        if in_cooldown {
            tracing::debug!(
                "Suppressing {} {} alert: previous alert within cooldown",
                severity.as_str(),
                metric.label()
            );
            continue;
        }

        alerts.push(PendingAlert {
            metric,
            severity,
            value,
            message: violation_message(metric, value, band, direction, severity),
        });
    }

    Evaluation {
        detected,
        suppressed: detected - alerts.len(),
        alerts,
    }
}

/// Compare one value against its band. `None` means the value is inside the
/// optimal range (inclusive on both boundaries). Severity escalates to
/// critical only strictly beyond the margin, so a value sitting exactly on
/// the margin stays a warning.
fn classify(band: &Band, value: f64) -> Option<(Severity, Direction)> {
    // ---
    if value < band.low {
        let severity = if value < band.low - band.critical_margin {
            Severity::Critical
        } else {
            Severity::Warning
        };
        Some((severity, Direction::Low))
    } else if value > band.high {
        let severity = if value > band.high + band.critical_margin {
            Severity::Critical
        } else {
            Severity::Warning
        };
        Some((severity, Direction::High))
    } else {
        None
    }
}

fn violation_message(
    metric: Metric,
    value: f64,
    band: &Band,
    direction: Direction,
    severity: Severity,
) -> String {
    // ---
    let side = match direction {
        Direction::Low => "below",
        Direction::High => "above",
    };
    let unit = metric.unit();
    format!(
        "{severity} {label} at {value}{unit} is {side} the optimal range {low}-{high}{unit}",
        severity = severity.as_str(),
        label = metric.label(),
        value = metric.format_value(value),
        low = metric.format_value(band.low),
        high = metric.format_value(band.high),
    )
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).unwrap()
    }

    fn reading(soil: i32, light: i32, temperature: f32, humidity: f32) -> Reading {
        // ---
        Reading {
            id: Uuid::new_v4(),
            soil,
            light,
            temperature,
            humidity,
            recorded_at: at(30),
        }
    }

    fn past_alert(metric: Metric, triggered_at: DateTime<Utc>) -> Alert {
        // ---
        Alert {
            id: Uuid::new_v4(),
            reading_id: Uuid::new_v4(),
            metric,
            severity: Severity::Warning,
            value: 0.0,
            message: String::new(),
            triggered_at,
        }
    }

    fn cooldown() -> Duration {
        Duration::seconds(1800)
    }

    #[test]
    fn test_in_band_reading_raises_nothing() {
        // ---
        let latest = reading(2100, 1200, 28.0, 60.0);
        let eval = evaluate(&latest, &[], &Thresholds::default(), cooldown());

        assert_eq!(eval.detected, 0);
        assert!(eval.alerts.is_empty());
        assert!(!eval.notify());
    }

    #[test]
    fn test_band_boundaries_are_optimal() {
        // ---
        // Exactly on the floor/ceiling is still inside the band
        let latest = reading(1800, 1800, 24.0, 80.0);
        let eval = evaluate(&latest, &[], &Thresholds::default(), cooldown());

        assert_eq!(eval.detected, 0);
    }

    #[test]
    fn test_dry_soil_raises_one_warning() {
        // ---
        // Example from the plant's documented ranges: soil 1500 is below the
        // 1800 floor but within the 300 critical margin
        let latest = reading(1500, 1000, 28.0, 60.0);
        let eval = evaluate(&latest, &[], &Thresholds::default(), cooldown());

        assert_eq!(eval.detected, 1);
        assert_eq!(eval.alerts.len(), 1);
        assert!(eval.notify());

        let alert = &eval.alerts[0];
        assert_eq!(alert.metric, Metric::Soil);
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.value, 1500.0);
        assert!(alert.message.contains("soil moisture"));
        assert!(alert.message.contains("1500"));
        assert!(alert.message.contains("1800-2600"));
    }

    #[test]
    fn test_severity_escalates_beyond_critical_margin() {
        // ---
        // Ceiling 35 with margin 5: 36 stays a warning, 42 is critical
        let warm = reading(2100, 1200, 36.0, 65.0);
        let eval = evaluate(&warm, &[], &Thresholds::default(), cooldown());
        assert_eq!(eval.alerts.len(), 1);
        assert_eq!(eval.alerts[0].severity, Severity::Warning);

        let hot = reading(2100, 1200, 42.0, 65.0);
        let eval = evaluate(&hot, &[], &Thresholds::default(), cooldown());
        assert_eq!(eval.alerts.len(), 1);
        assert_eq!(eval.alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn test_margin_boundary_stays_warning() {
        // ---
        // Exactly low - margin is not yet critical
        let latest = reading(1500, 1200, 28.0, 60.0);
        let eval = evaluate(&latest, &[], &Thresholds::default(), cooldown());
        assert_eq!(eval.alerts[0].severity, Severity::Warning);

        let latest = reading(1499, 1200, 28.0, 60.0);
        let eval = evaluate(&latest, &[], &Thresholds::default(), cooldown());
        assert_eq!(eval.alerts[0].severity, Severity::Critical);
    }

    #[test]
    fn test_cooldown_suppresses_repeat_alert() {
        // ---
        // Soil alerted 5 minutes before this reading; 30-minute cooldown
        let latest = reading(1500, 1200, 28.0, 60.0);
        let recent = vec![past_alert(Metric::Soil, at(25))];

        let eval = evaluate(&latest, &recent, &Thresholds::default(), cooldown());

        assert_eq!(eval.detected, 1);
        assert_eq!(eval.suppressed, 1);
        assert!(eval.alerts.is_empty());
        assert!(!eval.notify());
    }

    #[test]
    fn test_expired_cooldown_alerts_again() {
        // ---
        // Previous soil alert is 40 minutes old, outside the 30-minute window
        let latest = reading(1500, 1200, 28.0, 60.0);
        let recent = vec![past_alert(Metric::Soil, Utc.with_ymd_and_hms(2025, 6, 1, 11, 50, 0).unwrap())];

        let eval = evaluate(&latest, &recent, &Thresholds::default(), cooldown());

        assert_eq!(eval.suppressed, 0);
        assert_eq!(eval.alerts.len(), 1);
    }

    #[test]
    fn test_cooldown_is_scoped_per_metric() {
        // ---
        // A recent soil alert must not suppress a fresh temperature alert
        let latest = reading(1500, 1200, 38.0, 60.0);
        let recent = vec![past_alert(Metric::Soil, at(25))];

        let eval = evaluate(&latest, &recent, &Thresholds::default(), cooldown());

        assert_eq!(eval.detected, 2);
        assert_eq!(eval.suppressed, 1);
        assert_eq!(eval.alerts.len(), 1);
        assert_eq!(eval.alerts[0].metric, Metric::Temperature);
    }

    #[test]
    fn test_multiple_metrics_alert_together() {
        // ---
        // Dry, dark, hot and arid at once: four independent violations
        let latest = reading(1500, 300, 41.0, 20.0);
        let eval = evaluate(&latest, &[], &Thresholds::default(), cooldown());

        assert_eq!(eval.detected, 4);
        assert_eq!(eval.alerts.len(), 4);

        let metrics: Vec<Metric> = eval.alerts.iter().map(|a| a.metric).collect();
        assert_eq!(
            metrics,
            vec![Metric::Soil, Metric::Light, Metric::Temperature, Metric::Humidity]
        );
    }

    #[test]
    fn test_wet_side_violation_reports_above() {
        // ---
        let latest = reading(2700, 1200, 28.0, 60.0);
        let eval = evaluate(&latest, &[], &Thresholds::default(), cooldown());

        assert_eq!(eval.alerts.len(), 1);
        assert!(eval.alerts[0].message.contains("above"));
    }
}
