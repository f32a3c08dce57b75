//! Connection handling for the direct-query backend.

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::config::Database;

fn connect_options(settings: &Database) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .database(&settings.dbname);
    if let Some(password) = &settings.password {
        options = options.password(password);
    }
    options
}

/// Open a pool capped at a single connection, so every catalog query of a
/// run observes one session. `pg_get_function_identity_arguments` output
/// depends on the session's search_path, so it is pinned on connect.
pub async fn connect(settings: &Database) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("SET search_path = public, pg_catalog")
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect_with(connect_options(settings))
        .await
        .with_context(|| {
            format!(
                "connecting to database {} at {}:{}",
                settings.dbname, settings.host, settings.port
            )
        })?;

    info!("Connected to {}:{}", settings.host, settings.port);
    Ok(pool)
}
