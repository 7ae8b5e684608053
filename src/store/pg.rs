use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::parsing::catalog::{CategorySpec, SUMMARY_COLUMN};
use crate::parsing::{CanonicalRecord, FieldValue};

use super::{PendingRow, RecordStore, SummaryStore, SummaryTarget};

/// Postgres-backed store. Table and column names come from the static
/// catalog; every value is bound.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(dsn)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool { &self.pool }

    pub async fn count_pending(&self, target: &SummaryTarget) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) AS n FROM {table} WHERE {pending}",
            table = target.table,
            pending = pending_predicate(target),
        );
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        Ok(row.get::<i64, _>("n"))
    }
}

fn pending_predicate(target: &SummaryTarget) -> String {
    format!(
        "({s} IS NULL OR {s} = '') AND {u} IS NOT NULL AND {u} <> ''",
        s = SUMMARY_COLUMN,
        u = target.url_column,
    )
}

#[async_trait]
impl RecordStore for PgStore {
    async fn insert_record(
        &self,
        spec: &CategorySpec,
        record: &CanonicalRecord,
        symbol: Option<&str>,
    ) -> Result<bool> {
        let sql = spec.insert_sql();
        let mut q = sqlx::query(&sql).bind(&record.guid).bind(&record.title);
        for col in &record.columns {
            q = match &col.value {
                FieldValue::Text(v) => q.bind(v.as_deref()),
                FieldValue::Date(v) => q.bind(*v),
                FieldValue::Timestamp(v) => q.bind(*v),
                FieldValue::Decimal(v) => q.bind(*v),
            };
        }
        let exec = q.bind(symbol).execute(&self.pool).await?;
        Ok(exec.rows_affected() == 1)
    }
}

#[async_trait]
impl SummaryStore for PgStore {
    async fn pending(&self, target: &SummaryTarget) -> Result<Vec<PendingRow>> {
        let sql = format!(
            "SELECT {key} AS key, {url} AS url FROM {table} WHERE {pending} ORDER BY created_at, {key}",
            key = target.key_column,
            url = target.url_column,
            table = target.table,
            pending = pending_predicate(target),
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let out = rows
            .into_iter()
            .map(|row| PendingRow { key: row.get::<String, _>("key"), url: row.get::<String, _>("url") })
            .collect();
        Ok(out)
    }

    async fn save_summary(&self, target: &SummaryTarget, key: &str, summary: &str) -> Result<()> {
        let sql = format!(
            "UPDATE {table} SET {s} = $1 WHERE {key} = $2",
            table = target.table,
            s = SUMMARY_COLUMN,
            key = target.key_column,
        );
        let mut tx = self.pool.begin().await?;
        sqlx::query(&sql).bind(summary).bind(key).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}
