//! Webhook notification composition and delivery.
//!
//! Each evaluator or reporter invocation sends at most ONE outbound message:
//! alerts for a reading are always batched into a single payload so one bad
//! reading never fans out into four webhook calls. Delivery failure is the
//! caller's signal to report `notification_sent: false`; the alerts or the
//! summary are already persisted/returned by then, so nothing is lost.

use std::time::Duration;

use anyhow::Result;

use crate::models::{Alert, Metric, Reading};
use crate::reporter::Summary;

// ---

/// POST `{"text": ...}` to the webhook. Non-2xx counts as failure.
pub async fn send(webhook_url: &str, text: &str) -> Result<()> {
    // ---
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    client
        .post(webhook_url)
        .json(&serde_json::json!({ "text": text }))
        .send()
        .await?
        .error_for_status()?;

    Ok(())
}

/// Compose the single batched message for one evaluation run.
pub fn alert_text(reading: &Reading, alerts: &[Alert]) -> String {
    // ---
    let mut lines = vec![format!(
        "Plant alert: {} metric(s) out of range at {}",
        alerts.len(),
        reading.recorded_at.format("%Y-%m-%d %H:%M UTC")
    )];
    for alert in alerts {
        lines.push(format!("- {}", alert.message));
    }
    lines.join("\n")
}

/// Compose the daily report message from a summary.
pub fn report_text(summary: &Summary) -> String {
    // ---
    if summary.reading_count == 0 {
        return format!(
            "Daily plant report: no readings between {} and {}",
            summary.window_start.format("%Y-%m-%d %H:%M UTC"),
            summary.window_end.format("%Y-%m-%d %H:%M UTC")
        );
    }

    let mut lines = vec![format!(
        "Daily plant report: {} readings between {} and {}",
        summary.reading_count,
        summary.window_start.format("%Y-%m-%d %H:%M UTC"),
        summary.window_end.format("%Y-%m-%d %H:%M UTC")
    )];

    for metric in Metric::ALL {
        match summary.stats.get(metric) {
            Some(stats) => {
                let unit = metric.unit();
                lines.push(format!(
                    "- {}: avg {}{unit} (min {}{unit}, max {}{unit}), {}",
                    metric.label(),
                    metric.format_value(stats.avg),
                    metric.format_value(stats.min),
                    metric.format_value(stats.max),
                    stats.trend.as_str(),
                ));
            }
            None => lines.push(format!("- {}: no data", metric.label())),
        }
    }

    if let Some(recommendation) = &summary.recommendation {
        lines.push(format!("Recommendation: {}", recommendation));
    }

    lines.join("\n")
}
