//! Staging sink
//!
//! [`StagingSink`] is the write interface the loader drives. The PostgreSQL
//! implementation keeps one connection and one transaction for the whole
//! run: the truncate and every accepted row become visible together at
//! commit, or not at all.
//!
//! Only one load may run against a given table at a time. Nothing here
//! enforces that.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Acquire, Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{validate_table_identifier, DatabaseConfig};
use crate::error::{Result, SinkError};
use crate::normalize::NormalizedRow;

/// Destination for one load run
#[async_trait]
pub trait StagingSink: Send {
    /// Remove every previously staged row
    async fn clear(&mut self) -> std::result::Result<(), SinkError>;

    /// Stage one row; [`SinkError::Insert`] means only this row was rejected
    async fn insert(&mut self, row: &NormalizedRow) -> std::result::Result<(), SinkError>;

    /// Make the clear and all accepted rows visible
    async fn commit(&mut self) -> std::result::Result<(), SinkError>;
}

/// Row counts reported to the operator after a load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StagingCounts {
    pub total: i64,
    pub with_coordinates: i64,
    pub without_coordinates: i64,
}

struct Statements {
    create: String,
    truncate: String,
    insert: String,
    verify: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            create: format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    event_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL,
                    type TEXT NOT NULL,
                    location_name TEXT NOT NULL,
                    location_raw TEXT NOT NULL,
                    latitude DOUBLE PRECISION,
                    longitude DOUBLE PRECISION,
                    event_datetime TEXT NOT NULL,
                    raw_payload JSONB NOT NULL,
                    loaded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    CHECK ((latitude IS NULL) = (longitude IS NULL))
                )
                "#
            ),
            truncate: format!("TRUNCATE TABLE {table}"),
            insert: format!(
                r#"
                INSERT INTO {table} (
                    event_id, name, description, type, location_name, location_raw,
                    latitude, longitude, event_datetime, raw_payload
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10::jsonb)
                "#
            ),
            verify: format!(
                r#"
                SELECT
                    COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE latitude IS NOT NULL AND longitude IS NOT NULL)
                        AS with_coordinates
                FROM {table}
                "#
            ),
        }
    }
}

/// PostgreSQL staging table
pub struct PgStagingSink {
    pool: PgPool,
    table: String,
    statements: Statements,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStagingSink {
    /// Open the single connection used for this run
    pub async fn connect(config: &DatabaseConfig, table: &str) -> Result<Self> {
        validate_table_identifier(table)?;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(SinkError::Connection)?;

        info!(table, "Connected to staging database");
        Ok(Self {
            pool,
            table: table.to_string(),
            statements: Statements::for_table(table),
            tx: None,
        })
    }

    /// Create the staging table if it does not exist yet
    pub async fn ensure_table(&self) -> std::result::Result<(), SinkError> {
        sqlx::query(&self.statements.create)
            .execute(&self.pool)
            .await
            .map_err(SinkError::Query)?;

        debug!(table = %self.table, "Staging table ready");
        Ok(())
    }

    /// Count staged rows, split by coordinate presence
    ///
    /// Call after [`StagingSink::commit`]; the pool holds a single connection.
    pub async fn verify(&self) -> std::result::Result<StagingCounts, SinkError> {
        let (total, with_coordinates): (i64, i64) = sqlx::query_as(&self.statements.verify)
            .fetch_one(&self.pool)
            .await
            .map_err(SinkError::Query)?;

        Ok(StagingCounts {
            total,
            with_coordinates,
            without_coordinates: total - with_coordinates,
        })
    }

    /// Release the connection, discarding anything left uncommitted
    pub async fn close(mut self) {
        if let Some(tx) = self.tx.take() {
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Rollback of uncommitted staging work failed");
            }
        }
        self.pool.close().await;
        debug!(table = %self.table, "Staging connection closed");
    }
}

async fn open_transaction<'s>(
    pool: &PgPool,
    slot: &'s mut Option<Transaction<'static, Postgres>>,
) -> std::result::Result<&'s mut Transaction<'static, Postgres>, SinkError> {
    let tx = match slot.take() {
        Some(tx) => tx,
        None => pool.begin().await.map_err(SinkError::Connection)?,
    };
    Ok(slot.insert(tx))
}

#[async_trait]
impl StagingSink for PgStagingSink {
    async fn clear(&mut self) -> std::result::Result<(), SinkError> {
        let tx = open_transaction(&self.pool, &mut self.tx).await?;

        sqlx::query(&self.statements.truncate)
            .execute(&mut **tx)
            .await
            .map_err(|source| SinkError::Clear {
                table: self.table.clone(),
                source,
            })?;

        Ok(())
    }

    async fn insert(&mut self, row: &NormalizedRow) -> std::result::Result<(), SinkError> {
        let tx = open_transaction(&self.pool, &mut self.tx).await?;
        let mut savepoint = tx.begin().await.map_err(SinkError::Query)?;

        let result = sqlx::query(&self.statements.insert)
            .bind(&row.event_id)
            .bind(&row.name)
            .bind(&row.description)
            .bind(&row.event_type)
            .bind(&row.location_name)
            .bind(&row.location_raw)
            .bind(row.latitude)
            .bind(row.longitude)
            .bind(&row.event_datetime)
            .bind(&row.raw_payload)
            .execute(&mut *savepoint)
            .await;

        match result {
            Ok(_) => {
                savepoint.commit().await.map_err(SinkError::Query)?;
                Ok(())
            },
            Err(e @ sqlx::Error::Database(_)) => {
                savepoint.rollback().await.map_err(SinkError::Query)?;
                Err(SinkError::insert(&row.event_id, e))
            },
            Err(e) => Err(SinkError::Query(e)),
        }
    }

    async fn commit(&mut self) -> std::result::Result<(), SinkError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(SinkError::Commit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use blotter_common::BlotterError;

    fn unreachable_database() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgresql://127.0.0.1:9/blotter".to_string(),
            connect_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_unsafe_table_before_connecting() {
        let result = PgStagingSink::connect(&unreachable_database(), "events; DROP TABLE users").await;

        assert!(matches!(
            result,
            Err(IngestError::Common(BlotterError::InvalidIdentifier(_)))
        ));
    }

    #[test]
    fn test_statements_target_configured_table() {
        let statements = Statements::for_table("crime_db.police_events_staging");

        assert!(statements.create.contains("crime_db.police_events_staging"));
        assert!(statements.truncate.contains("crime_db.police_events_staging"));
        assert!(statements.insert.contains("$10::jsonb"));
    }
}
