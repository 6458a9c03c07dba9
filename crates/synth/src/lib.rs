pub mod llm;

pub use llm::{LlmBackend, LlmClient};

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("language model unavailable: {0}")]
    Backend(String),
    #[error("generated statement rejected: {reason}")]
    Rejected {
        reason: String,
        /// The vetted-and-failed candidate, for the envelope's
        /// sql_text. Already stripped of model prose.
        sql_text: String,
    },
}

/// Turns a rendered prompt into a vetted read-only SQL statement.
/// Exactly one retry is allowed, whether the first attempt failed in
/// transport or was rejected by the guard.
pub struct Synthesizer {
    backend: Arc<dyn LlmBackend>,
    guard: Regex,
    row_limit: usize,
}

impl Synthesizer {
    pub fn new(backend: Arc<dyn LlmBackend>, row_limit: usize) -> Result<Self> {
        let guard = Regex::new(r"(?i)\b(insert|update|delete|drop|alter|truncate|create|grant)\b")
            .context("Failed to compile statement guard")?;
        Ok(Self {
            backend,
            guard,
            row_limit,
        })
    }

    pub async fn synthesize(&self, prompt: &str) -> Result<String, SynthesisError> {
        match self.attempt(prompt).await {
            Ok(sql) => Ok(sql),
            Err(first) => {
                warn!(error = %first, "SQL synthesis failed, retrying once");
                let retry_prompt = match &first {
                    SynthesisError::Rejected { reason, .. } => format!(
                        "{prompt}\n\nYour previous answer was rejected: {reason}. \
                         Output exactly one PostgreSQL SELECT statement and nothing else."
                    ),
                    SynthesisError::Backend(_) => prompt.to_string(),
                };
                self.attempt(&retry_prompt).await
            }
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<String, SynthesisError> {
        let raw = self
            .backend
            .generate(prompt)
            .await
            .map_err(|e| SynthesisError::Backend(e.to_string()))?;

        let sql = extract_sql(&raw);
        self.validate(&sql)?;
        Ok(finalize(&sql, self.row_limit))
    }

    fn validate(&self, sql: &str) -> Result<(), SynthesisError> {
        let rejected = |reason: String| SynthesisError::Rejected {
            reason,
            sql_text: sql.to_string(),
        };

        if sql.is_empty() {
            return Err(rejected("output contained no SQL statement".to_string()));
        }

        let lowered = sql.to_lowercase();
        if !lowered.starts_with("select") && !lowered.starts_with("with") {
            return Err(rejected(
                "statement must start with SELECT or WITH".to_string(),
            ));
        }

        if let Some(found) = self.guard.find(sql) {
            return Err(rejected(format!(
                "mutating keyword {} is not allowed",
                found.as_str().to_uppercase()
            )));
        }

        Ok(())
    }
}

fn select_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bselect\b").expect("select pattern"))
}

// A WITH only opens a statement when it reads like a CTE header;
// prose "with" ("Starting with the sales table: ...") must not win.
fn cte_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bwith\s+[A-Za-z_][A-Za-z0-9_]*\s+as\s*\(").expect("cte pattern")
    })
}

fn semicolon_limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i);\s*limit").expect("semicolon limit pattern"))
}

fn has_limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blimit\s+\d+").expect("limit pattern"))
}

/// Strip code fences and surrounding prose, keeping the statement from
/// its first SELECT (or CTE-opening WITH) onward.
pub fn extract_sql(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(open) = text.find("```") {
        let after = &text[open + 3..];
        let after = after.strip_prefix("sql").unwrap_or(after);
        text = match after.find("```") {
            Some(close) => &after[..close],
            None => after,
        };
    }

    let select_start = select_start_re().find(text).map(|m| m.start());
    let cte_start = cte_start_re().find(text).map(|m| m.start());

    let start = match (cte_start, select_start) {
        (Some(w), Some(s)) => Some(w.min(s)),
        (Some(w), None) => Some(w),
        (None, s) => s,
    };

    match start {
        Some(idx) => text[idx..].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Final cleanup: a stray semicolon before LIMIT, trailing semicolon,
/// and a missing row cap.
pub fn finalize(sql: &str, row_limit: usize) -> String {
    let mut sql = sql.trim().to_string();

    // Models sometimes close the statement and then add LIMIT.
    sql = semicolon_limit_re().replace_all(&sql, " LIMIT").to_string();

    sql = sql.trim_end_matches(';').trim_end().to_string();

    if !has_limit_re().is_match(&sql) {
        sql = format!("{sql} LIMIT {row_limit}");
    }

    sql
}
