use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, PgPool, Row, TypeInfo};
use std::time::Duration;
use tracing::warn;

use crate::{ResultEnvelope, SqlExecutor};

pub struct PostgresExecutor {
    pool: PgPool,
    statement_timeout: Duration,
    max_rows: usize,
}

impl PostgresExecutor {
    pub fn new(pool: PgPool, statement_timeout: Duration, max_rows: usize) -> Self {
        Self {
            pool,
            statement_timeout,
            max_rows,
        }
    }
}

#[async_trait]
impl SqlExecutor for PostgresExecutor {
    async fn execute(&self, sql: &str) -> ResultEnvelope {
        let fetched =
            tokio::time::timeout(self.statement_timeout, sqlx::query(sql).fetch_all(&self.pool))
                .await;

        let rows = match fetched {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                warn!(error = %e, "Statement execution failed");
                return ResultEnvelope::error(sql.to_string(), sanitize_db_error(&e));
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.statement_timeout.as_millis(),
                    "Statement execution timed out"
                );
                return ResultEnvelope::error(sql.to_string(), "query timed out".to_string());
            }
        };

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows: Vec<Map<String, Value>> = rows
            .iter()
            .take(self.max_rows)
            .map(row_to_json)
            .collect();

        ResultEnvelope::from_rows(sql.to_string(), columns, rows)
    }
}

/// Raw driver errors can echo table names, hosts and credentials, so
/// only a coarse category leaves this module.
fn sanitize_db_error(error: &sqlx::Error) -> String {
    match error {
        sqlx::Error::Database(_) => "database rejected the statement".to_string(),
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => "database unavailable".to_string(),
        _ => "database error".to_string(),
    }
}

/// Normalize a row for the envelope: numerics become JSON numbers,
/// dates become ISO strings, everything else is stringified.
fn row_to_json(row: &PgRow) -> Map<String, Value> {
    let mut map = Map::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let value = match column.type_info().name() {
            "INT2" => row
                .try_get::<Option<i16>, _>(idx)
                .ok()
                .flatten()
                .map(Value::from),
            "INT4" => row
                .try_get::<Option<i32>, _>(idx)
                .ok()
                .flatten()
                .map(Value::from),
            "INT8" => row
                .try_get::<Option<i64>, _>(idx)
                .ok()
                .flatten()
                .map(Value::from),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(idx)
                .ok()
                .flatten()
                .map(|v| Value::from(v as f64)),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(idx)
                .ok()
                .flatten()
                .map(Value::from),
            "NUMERIC" => row
                .try_get::<Option<Decimal>, _>(idx)
                .ok()
                .flatten()
                .and_then(|d| d.to_f64())
                .map(Value::from),
            "BOOL" => row
                .try_get::<Option<bool>, _>(idx)
                .ok()
                .flatten()
                .map(Value::from),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(idx)
                .ok()
                .flatten()
                .map(|d| Value::from(d.to_string())),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(idx)
                .ok()
                .flatten()
                .map(|t| Value::from(t.format("%Y-%m-%dT%H:%M:%S").to_string())),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)
                .ok()
                .flatten()
                .map(|t| Value::from(t.to_rfc3339())),
            _ => row
                .try_get::<Option<String>, _>(idx)
                .ok()
                .flatten()
                .map(Value::from),
        };
        map.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    map
}
