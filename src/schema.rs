//! Database schema management for `plantguard`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `readings` table for ingested sensor samples and the `alerts`
/// table for raised out-of-band events. Safe to call on every startup; no-op
/// if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Sensor samples; `recorded_at` is store-assigned and authoritative for
    // ordering.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS readings (
            id          UUID PRIMARY KEY,
            soil        INTEGER     NOT NULL,
            light       INTEGER     NOT NULL,
            temperature REAL        NOT NULL,
            humidity    REAL        NOT NULL,
            recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Raised alerts. `reading_id` is a relation without a foreign key
    // constraint: alerts must survive reading retention cleanups done by
    // other writers.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id           UUID PRIMARY KEY,
            reading_id   UUID             NOT NULL,
            metric       TEXT             NOT NULL,
            severity     TEXT             NOT NULL,
            value        DOUBLE PRECISION NOT NULL,
            message      TEXT             NOT NULL,
            triggered_at TIMESTAMPTZ      NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Latest-reading and report-window queries scan by time
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_readings_recorded_at
            ON readings (recorded_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Cooldown lookups filter by metric within a time horizon
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_alerts_metric_triggered_at
            ON alerts (metric, triggered_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
