//! Evaluator trigger: `POST /check`.
//!
//! Invoked by the external scheduler after each new reading (or on a polling
//! interval). Loads the latest stored reading, the alert history inside the
//! cooldown horizon, runs the pure evaluator, persists surviving alerts as
//! one batch and sends at most one webhook notification. The alert history
//! in the store is the single source of truth for cooldown suppression, so
//! overlapping invocations cannot double-alert through in-process state.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, response::Response, routing::post,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::evaluator::{self, PendingAlert};
use crate::{notify, Alert, Config, Reading};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/check", post(handler))
}

#[derive(Serialize)]
struct CheckResponse {
    success: bool,
    /// `ok`, `no_data`, or `skipped_invalid`. A caller can always tell
    /// "healthy, no alerts" apart from "the check did not run".
    status: &'static str,
    reading: Option<Reading>,
    alerts_detected: usize,
    alerts_triggered: usize,
    notification_sent: bool,
}

impl CheckResponse {
    fn empty(status: &'static str, reading: Option<Reading>) -> Self {
        // ---
        CheckResponse {
            success: true,
            status,
            reading,
            alerts_detected: 0,
            alerts_triggered: 0,
            notification_sent: false,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

/// A dependency failure the scheduler should retry, distinct from a clean
/// "no violation" result.
fn retryable_error(context: &str, e: impl std::fmt::Display) -> Response {
    // ---
    error!("{}: {}", context, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            success: false,
            error: format!("{context}: {e}"),
        }),
    )
        .into_response()
}

async fn handler(State((pool, config)): State<(PgPool, Config)>) -> Response {
    // ---
    info!("POST /check - Evaluating latest reading");

    let latest = match latest_reading(&pool).await {
        Ok(Some(reading)) => reading,
        Ok(None) => {
            info!("No readings stored yet, nothing to evaluate");
            return (StatusCode::OK, Json(CheckResponse::empty("no_data", None))).into_response();
        }
        Err(e) => return retryable_error("Failed to load latest reading", e),
    };

    if !latest.is_valid() {
        warn!(
            "Skipping malformed reading {}: non-finite or negative metric fields",
            latest.id
        );
        return (
            StatusCode::OK,
            Json(CheckResponse::empty("skipped_invalid", Some(latest))),
        )
            .into_response();
    }

    let cooldown = Duration::seconds(i64::from(config.cooldown_secs));
    let recent = match recent_alerts(&pool, latest.recorded_at - cooldown).await {
        Ok(alerts) => alerts,
        Err(e) if config.alert_fail_open => {
            warn!("Cooldown lookup failed, proceeding without history (ALERT_FAIL_OPEN): {e}");
            Vec::new()
        }
        Err(e) => return retryable_error("Failed to load recent alerts", e),
    };

    let evaluation = evaluator::evaluate(&latest, &recent, &config.thresholds, cooldown);
    info!(
        "Reading {}: {} violation(s) detected, {} suppressed by cooldown",
        latest.id, evaluation.detected, evaluation.suppressed
    );

    let triggered = match insert_alerts(&pool, &latest, &evaluation.alerts).await {
        Ok(alerts) => alerts,
        Err(e) => return retryable_error("Failed to store alerts", e),
    };

    // One batched message per invocation, never one per metric
    let mut notification_sent = false;
    if evaluation.notify() {
        let text = notify::alert_text(&latest, &triggered);
        match &config.webhook_url {
            Some(url) => match notify::send(url, &text).await {
                Ok(()) => notification_sent = true,
                Err(e) => warn!("Alert notification failed, alerts remain stored: {}", e),
            },
            None => info!("No webhook configured, alert notification:\n{}", text),
        }
    }

    (
        StatusCode::OK,
        Json(CheckResponse {
            success: true,
            status: "ok",
            alerts_detected: evaluation.detected,
            alerts_triggered: triggered.len(),
            notification_sent,
            reading: Some(latest),
        }),
    )
        .into_response()
}

// ---

/// Most recent reading by `recorded_at`; timestamps are authoritative, not
/// insertion order.
async fn latest_reading(pool: &PgPool) -> Result<Option<Reading>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, soil, light, temperature, humidity, recorded_at
        FROM readings
        ORDER BY recorded_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}

/// Alert history after `cutoff`, across all metrics.
async fn recent_alerts(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<Vec<Alert>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Alert>(
        r#"
        SELECT id, reading_id, metric, severity, value, message, triggered_at
        FROM alerts
        WHERE triggered_at > $1
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
}

/// Persist the surviving alerts as a single batch; all or nothing.
async fn insert_alerts(
    pool: &PgPool,
    reading: &Reading,
    pending: &[PendingAlert],
) -> Result<Vec<Alert>, sqlx::Error> {
    // ---
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let mut tx = pool.begin().await?;
    let mut stored = Vec::with_capacity(pending.len());

    for alert in pending {
        let row = sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (id, reading_id, metric, severity, value, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, reading_id, metric, severity, value, message, triggered_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(reading.id)
        .bind(alert.metric)
        .bind(alert.severity)
        .bind(alert.value)
        .bind(&alert.message)
        .fetch_one(&mut *tx)
        .await?;
        stored.push(row);
    }

    tx.commit().await?;
    Ok(stored)
}
