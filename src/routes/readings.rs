//! Reading ingestion and time-range queries against the store.
//!
//! Any writer may produce readings; this endpoint is the one this repository
//! ships. `recorded_at` and `id` are assigned by the store on insert, so the
//! payload carries only the four metric values.

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::post, Json,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{Config, NewReading, Reading};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/readings", post(ingest).get(list))
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

async fn ingest(
    State((pool, _config)): State<(PgPool, Config)>,
    Json(payload): Json<NewReading>,
) -> impl IntoResponse {
    // ---
    if let Err(reason) = payload.validate() {
        warn!("POST /readings - Rejecting malformed reading: {}", reason);
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                success: false,
                error: reason,
            }),
        )
            .into_response();
    }

    match insert_reading(&pool, &payload).await {
        Ok(reading) => {
            info!(
                "POST /readings - Stored reading {} at {}",
                reading.id, reading.recorded_at
            );
            (StatusCode::CREATED, Json(reading)).into_response()
        }
        Err(e) => {
            error!("Failed to store reading: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: "Failed to store reading".into(),
                }),
            )
                .into_response()
        }
    }
}

/// Query parameters for the reading listing.
#[derive(Debug, Deserialize)]
struct ReadingsQuery {
    /// Lower bound on `recorded_at` (RFC 3339).
    since: Option<DateTime<Utc>>,
    limit: Option<u32>,
}

async fn list(
    Query(params): Query<ReadingsQuery>,
    State((pool, _config)): State<(PgPool, Config)>,
) -> impl IntoResponse {
    // ---
    let limit = params.limit.unwrap_or(100).min(1000);

    match list_readings(&pool, params.since, limit).await {
        Ok(readings) => (StatusCode::OK, Json(readings)).into_response(),
        Err(e) => {
            error!("Failed to list readings: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: "Failed to list readings".into(),
                }),
            )
                .into_response()
        }
    }
}

// ---

async fn insert_reading(pool: &PgPool, payload: &NewReading) -> Result<Reading, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Reading>(
        r#"
        INSERT INTO readings (id, soil, light, temperature, humidity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, soil, light, temperature, humidity, recorded_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.soil)
    .bind(payload.light)
    .bind(payload.temperature)
    .bind(payload.humidity)
    .fetch_one(pool)
    .await
}

async fn list_readings(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
    limit: u32,
) -> Result<Vec<Reading>, sqlx::Error> {
    // ---
    match since {
        Some(since) => {
            sqlx::query_as::<_, Reading>(
                r#"
                SELECT id, soil, light, temperature, humidity, recorded_at
                FROM readings
                WHERE recorded_at >= $1
                ORDER BY recorded_at DESC
                LIMIT $2
                "#,
            )
            .bind(since)
            .bind(i64::from(limit))
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Reading>(
                r#"
                SELECT id, soil, light, temperature, humidity, recorded_at
                FROM readings
                ORDER BY recorded_at DESC
                LIMIT $1
                "#,
            )
            .bind(i64::from(limit))
            .fetch_all(pool)
            .await
        }
    }
}
