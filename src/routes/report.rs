//! Reporter trigger: `POST /report`.
//!
//! Invoked on a daily schedule. Loads the trailing window of readings,
//! computes per-metric statistics and trends, optionally folds in a
//! weather-aware watering recommendation, and delivers the rendered report
//! over the webhook. A store failure aborts the run (no partial report); a
//! weather or webhook failure degrades gracefully.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, response::Response, routing::post,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::reporter::{self, SummaryStats};
use crate::{notify, weather, Config, Reading};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/report", post(handler))
}

#[derive(Serialize)]
struct ReportResponse {
    success: bool,
    /// Rendered report, identical to the notification payload.
    message: String,
    /// Per-metric `{avg, min, max, trend}`; `null` entries mean no data.
    stats: SummaryStats,
    reading_count: usize,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    recommendation: Option<String>,
    notification_sent: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

async fn handler(State((pool, config)): State<(PgPool, Config)>) -> Response {
    // ---
    info!(
        "POST /report - Summarizing trailing {}h window",
        config.report_window_hours
    );

    let window_end = Utc::now();
    let window_start = window_end - Duration::hours(i64::from(config.report_window_hours));

    // Store failure is a hard error for this invocation: no partial report
    let window = match readings_between(&pool, window_start, window_end).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to load report window: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: format!("Failed to load report window: {e}"),
                }),
            )
                .into_response();
        }
    };

    let mut summary = reporter::summarize(&window, window_start, window_end, config.trend_tolerance);
    info!(
        "Summarized {} reading(s) between {} and {}",
        summary.reading_count, window_start, window_end
    );

    if let Some(url) = &config.weather_url {
        match weather::fetch_outlook(url).await {
            Ok(outlook) => {
                let soil_avg = summary.stats.soil.as_ref().map(|s| s.avg);
                summary.recommendation =
                    weather::watering_recommendation(&outlook, soil_avg, &config.thresholds);
            }
            Err(e) => {
                warn!("Weather collaborator unavailable, omitting recommendation: {}", e);
            }
        }
    }

    let message = notify::report_text(&summary);

    let mut notification_sent = false;
    match &config.webhook_url {
        Some(url) => match notify::send(url, &message).await {
            Ok(()) => notification_sent = true,
            Err(e) => warn!("Report notification failed, summary returned to caller: {}", e),
        },
        None => info!("No webhook configured, daily report:\n{}", message),
    }

    (
        StatusCode::OK,
        Json(ReportResponse {
            success: true,
            message,
            stats: summary.stats,
            reading_count: summary.reading_count,
            window_start: summary.window_start,
            window_end: summary.window_end,
            recommendation: summary.recommendation,
            notification_sent,
        }),
    )
        .into_response()
}

// ---

/// Readings inside the window, ordered ascending for the half-window trend
/// split.
async fn readings_between(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Reading>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, soil, light, temperature, humidity, recorded_at
        FROM readings
        WHERE recorded_at >= $1 AND recorded_at < $2
        ORDER BY recorded_at ASC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}
