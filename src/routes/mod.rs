use axum::Router;
use sqlx::PgPool;

use crate::Config;

mod check;
mod health;
mod readings;
mod report;

// ---

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    Router::new()
        .merge(readings::router())
        .merge(check::router())
        .merge(report::router())
        .merge(health::router())
        .with_state((pool, config))
}
