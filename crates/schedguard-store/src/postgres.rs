//! The production store client, backed by `sqlx::PgPool`.
//!
//! Every statement is bound-parameterized — including the grace interval,
//! which spec §9 specifically calls out as a place the original built SQL
//! by string interpolation ("a port must parameterize all values,
//! including the grace interval, and pass them as bound arguments").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{types::PgInterval, PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::time::Duration;

use crate::{SchedulerStore, StoreError, CREATE_SCHEDULERS_TABLE};

/// Connects and disconnects per tick, per the resource policy in spec §5.
/// A single-connection pool is enough: the coordinator never issues
/// concurrent queries against its own store handle.
pub struct PgSchedulerStore {
    connection_uri: String,
    create_schema: bool,
    pool: Option<PgPool>,
}

impl PgSchedulerStore {
    pub fn new(connection_uri: impl Into<String>) -> Self {
        Self {
            connection_uri: connection_uri.into(),
            create_schema: false,
            pool: None,
        }
    }

    /// When set, `connect` issues `CREATE TABLE IF NOT EXISTS` before
    /// returning. Intended for local development only (see
    /// [`crate::CREATE_SCHEDULERS_TABLE`]'s doc comment).
    pub fn with_schema_bring_up(mut self, enabled: bool) -> Self {
        self.create_schema = enabled;
        self
    }

    fn pool(&self) -> Result<&PgPool, StoreError> {
        self.pool.as_ref().ok_or(StoreError::NotConnected)
    }
}

#[async_trait]
impl SchedulerStore for PgSchedulerStore {
    async fn connect(&mut self) -> Result<(), StoreError> {
        let options = PgConnectOptions::from_str(&self.connection_uri)
            .map_err(StoreError::from_connect)?;
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StoreError::from_connect)?;

        if self.create_schema {
            sqlx::query(CREATE_SCHEDULERS_TABLE)
                .execute(&pool)
                .await
                .map_err(StoreError::from_sqlx)?;
        }

        self.pool = Some(pool);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
    }

    async fn register(&mut self, address: &str) -> Result<DateTime<Utc>, StoreError> {
        let pool = self.pool()?;
        let row = sqlx::query(
            "INSERT INTO schedulers(address, birth, latest) \
             VALUES ($1, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP) \
             RETURNING birth",
        )
        .bind(address)
        .fetch_one(pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(row.try_get("birth").map_err(StoreError::from_sqlx)?)
    }

    async fn check_in(&mut self, address: &str, birth: DateTime<Utc>) -> Result<(), StoreError> {
        let pool = self.pool()?;
        sqlx::query(
            "INSERT INTO schedulers(address, birth, latest) \
             VALUES ($1, $2, CURRENT_TIMESTAMP)",
        )
        .bind(address)
        .bind(birth)
        .execute(pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(())
    }

    async fn evict_stale(&mut self, grace: Duration) -> Result<(), StoreError> {
        let pool = self.pool()?;
        // `$1::interval` binds the grace period as a parameter and casts
        // it server-side; the literal is never interpolated into the
        // statement text.
        let interval = PgInterval::try_from(grace).map_err(|e| {
            StoreError::Query(sqlx::Error::Decode(
                format!("grace period out of range: {e:?}").into(),
            ))
        })?;
        sqlx::query("DELETE FROM schedulers WHERE latest < CURRENT_TIMESTAMP - $1::interval")
            .bind(interval)
            .execute(pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        Ok(())
    }

    async fn leader_candidates(&mut self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
        let pool = self.pool()?;
        let rows = sqlx::query(
            "SELECT address, birth FROM schedulers \
             WHERE birth = (SELECT MIN(birth) FROM schedulers)",
        )
        .fetch_all(pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        rows.into_iter()
            .map(|row| {
                let address: String = row.try_get("address").map_err(StoreError::from_sqlx)?;
                let birth: DateTime<Utc> = row.try_get("birth").map_err(StoreError::from_sqlx)?;
                Ok((address, birth))
            })
            .collect()
    }

    async fn active_addresses(&mut self) -> Result<Vec<String>, StoreError> {
        let pool = self.pool()?;
        let rows = sqlx::query("SELECT DISTINCT address FROM schedulers")
            .fetch_all(pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        rows.into_iter()
            .map(|row| row.try_get("address").map_err(StoreError::from_sqlx))
            .collect()
    }

    async fn ordered_by_birth(&mut self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
        let pool = self.pool()?;
        let rows = sqlx::query("SELECT DISTINCT address, birth FROM schedulers ORDER BY birth ASC")
            .fetch_all(pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        rows.into_iter()
            .map(|row| {
                let address: String = row.try_get("address").map_err(StoreError::from_sqlx)?;
                let birth: DateTime<Utc> = row.try_get("birth").map_err(StoreError::from_sqlx)?;
                Ok((address, birth))
            })
            .collect()
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        // Each statement above auto-commits; sqlx does not hold an open
        // transaction across calls on a pool. Kept as a named operation to
        // match the store contract in spec §4.1.
        Ok(())
    }
}
