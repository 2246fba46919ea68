use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::config::Config;

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    /// Builds the pool without connecting. The connection monitor performs the
    /// first round trip, so the server can start while the backend is away.
    pub fn connect_lazy(config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_millis(config.db_connect_timeout_ms))
            .connect_lazy(&config.database_url)?;

        Ok(Self { pool })
    }

    /// Connects eagerly, failing if the backend does not answer.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }
}
