//! Shared PostgreSQL container for staging integration tests
//!
//! Requires a running Docker daemon; tests using it are `#[ignore]`d.

use anyhow::{Context, Result};
use blotter_ingest::config::{Config, DatabaseConfig};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;

/// PostgreSQL container plus a pool for assertions
pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
    connection_string: String,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        let container = Postgres::default()
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self {
            _container: container,
            pool,
            connection_string,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ingestion config pointed at this container
    pub fn config(&self, staging_table: &str) -> Config {
        Config {
            database: DatabaseConfig {
                url: self.connection_string.clone(),
                connect_timeout_secs: 30,
            },
            staging_table: staging_table.to_string(),
            ..Config::default()
        }
    }
}
