pub mod postgres;

pub use postgres::PostgresExecutor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    NoData,
    Error,
}

/// What the caller gets back for every question, success or not.
/// `error_detail` is always sanitized; raw driver errors go to the log
/// only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub status: QueryStatus,
    pub sql_text: String,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
    pub error_detail: Option<String>,
}

impl ResultEnvelope {
    /// Zero rows is a distinct outcome, not an error.
    pub fn from_rows(sql_text: String, columns: Vec<String>, rows: Vec<Map<String, Value>>) -> Self {
        let status = if rows.is_empty() {
            QueryStatus::NoData
        } else {
            QueryStatus::Success
        };
        Self {
            status,
            sql_text,
            row_count: rows.len(),
            columns,
            rows,
            error_detail: None,
        }
    }

    pub fn error(sql_text: String, detail: String) -> Self {
        Self {
            status: QueryStatus::Error,
            sql_text,
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            error_detail: Some(detail),
        }
    }
}

/// Seam for the relational backend. No retry at this layer: a failed
/// statement fails the query.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> ResultEnvelope;
}
