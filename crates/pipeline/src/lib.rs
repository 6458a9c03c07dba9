pub mod config;

pub use config::PipelineConfig;

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use executor::{ResultEnvelope, SqlExecutor};
use graph::Expander;
use promptgen::PromptConfig;
use resolve::EntityResolver;
use synth::{Synthesizer, SynthesisError};

/// The full question-to-envelope pipeline. Stages run strictly in
/// sequence; resolution misses and expansion outages degrade silently,
/// synthesis and execution failures surface as error envelopes.
pub struct AnswerPipeline {
    resolver: EntityResolver,
    expander: Arc<dyn Expander>,
    synthesizer: Synthesizer,
    executor: Arc<dyn SqlExecutor>,
    prompt_config: PromptConfig,
}

impl AnswerPipeline {
    pub fn new(
        resolver: EntityResolver,
        expander: Arc<dyn Expander>,
        synthesizer: Synthesizer,
        executor: Arc<dyn SqlExecutor>,
        prompt_config: PromptConfig,
    ) -> Self {
        Self {
            resolver,
            expander,
            synthesizer,
            executor,
            prompt_config,
        }
    }

    /// `session_hint` carries entity ids from earlier turns; they only
    /// influence sibling-cap tie-breaks, never resolution itself.
    pub async fn answer_query(
        &self,
        raw_query: &str,
        current_date: NaiveDate,
        session_hint: Option<BTreeSet<String>>,
    ) -> ResultEnvelope {
        let direct = self.resolver.resolve(raw_query).await;
        info!(entities = direct.len(), "Resolved direct entities");

        let preferred = session_hint.unwrap_or_default();
        let expanded = self.expander.expand(&direct, &preferred).await;
        info!(entities = expanded.len(), "Expanded context entities");

        let ctx = context::merge(&expanded, raw_query, current_date);
        let prompt = promptgen::build(&ctx, raw_query, &self.prompt_config);

        let sql = match self.synthesizer.synthesize(&prompt.render()).await {
            Ok(sql) => sql,
            Err(e) => {
                warn!(error = %e, "SQL synthesis failed");
                // The rejected candidate is already stripped of model
                // prose, so it is safe to report as the best-effort
                // statement.
                let (sql_text, detail) = match e {
                    SynthesisError::Backend(_) => {
                        (String::new(), "could not generate SQL for this question")
                    }
                    SynthesisError::Rejected { sql_text, .. } => {
                        (sql_text, "generated SQL failed validation")
                    }
                };
                return ResultEnvelope::error(sql_text, detail.to_string());
            }
        };

        info!(sql = sql.as_str(), "Executing synthesized statement");
        self.executor.execute(&sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use executor::QueryStatus;
    use graph::{ExpandedRef, NoopExpander};
    use resolve::{EntityKind, EntityRef, EntitySearch, ResolverConfig, SearchHit};
    use serde_json::{Map, Value};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use synth::LlmBackend;

    struct StubSearch {
        hits: Vec<(EntityKind, &'static str, SearchHit)>,
    }

    #[async_trait]
    impl EntitySearch for StubSearch {
        async fn search(
            &self,
            kind: EntityKind,
            text: &str,
            _top_k: usize,
        ) -> anyhow::Result<Vec<SearchHit>> {
            Ok(self
                .hits
                .iter()
                .filter(|(k, t, _)| *k == kind && *t == text)
                .map(|(_, _, h)| h.clone())
                .collect())
        }
    }

    struct FailingExpander;

    #[async_trait]
    impl Expander for FailingExpander {
        // Simulates an unreachable graph: direct refs pass through.
        async fn expand(
            &self,
            direct: &[EntityRef],
            _preferred: &BTreeSet<String>,
        ) -> Vec<ExpandedRef> {
            direct.iter().cloned().map(ExpandedRef::direct).collect()
        }
    }

    struct StubLlm {
        response: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    impl StubLlm {
        fn new(response: &'static str) -> Self {
            Self {
                response,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for StubLlm {
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.to_string())
        }
    }

    struct StubExecutor {
        rows: Vec<Map<String, Value>>,
        calls: AtomicUsize,
    }

    impl StubExecutor {
        fn new(rows: Vec<Map<String, Value>>) -> Self {
            Self {
                rows,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SqlExecutor for StubExecutor {
        async fn execute(&self, sql: &str) -> ResultEnvelope {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let columns = self
                .rows
                .first()
                .map(|r| r.keys().cloned().collect())
                .unwrap_or_default();
            ResultEnvelope::from_rows(sql.to_string(), columns, self.rows.clone())
        }
    }

    fn hit(id: &str, name: &str, score: f32) -> SearchHit {
        SearchHit {
            canonical_id: id.to_string(),
            display_name: name.to_string(),
            score,
            group_label: None,
        }
    }

    fn count_row(n: i64) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("count".to_string(), Value::from(n));
        row
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 20).unwrap()
    }

    struct Fixture {
        llm: Arc<StubLlm>,
        executor: Arc<StubExecutor>,
        pipeline: AnswerPipeline,
    }

    fn fixture(
        hits: Vec<(EntityKind, &'static str, SearchHit)>,
        llm_response: &'static str,
        rows: Vec<Map<String, Value>>,
        expander: Arc<dyn Expander>,
    ) -> Fixture {
        let llm = Arc::new(StubLlm::new(llm_response));
        let executor = Arc::new(StubExecutor::new(rows));
        let pipeline = AnswerPipeline::new(
            EntityResolver::new(Arc::new(StubSearch { hits }), ResolverConfig::default()),
            expander,
            Synthesizer::new(llm.clone(), 30).unwrap(),
            executor.clone(),
            PromptConfig::default(),
        );
        Fixture {
            llm,
            executor,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_category_count_question_without_locations() {
        let f = fixture(
            vec![],
            "SELECT COUNT(*) AS count FROM product_hierarchy WHERE category = 'Non Perishable'",
            vec![count_row(42)],
            Arc::new(NoopExpander),
        );

        let envelope = f
            .pipeline
            .answer_query(
                "How many products are in the Non Perishable category?",
                today(),
                None,
            )
            .await;

        assert_eq!(envelope.status, QueryStatus::Success);
        assert_eq!(envelope.row_count, 1);

        // No location was mentioned, so no store filter hint was offered.
        let prompts = f.llm.prompts.lock().unwrap();
        assert!(!prompts[0].contains("store_id = "));
        // The category wording pulled the hierarchy formula in.
        assert!(prompts[0].contains("Category rollup"));
    }

    #[tokio::test]
    async fn test_entity_and_date_resolution_reach_the_prompt() {
        let f = fixture(
            vec![
                (
                    EntityKind::Product,
                    "sandwich sales",
                    hit("P-210", "Club Sandwich", 0.86),
                ),
                (
                    EntityKind::Location,
                    "charlotte",
                    hit("S-044", "Charlotte Uptown", 0.92),
                ),
            ],
            "SELECT SUM(sales_units * total_amount) AS revenue FROM sales",
            vec![count_row(1)],
            Arc::new(NoopExpander),
        );

        let envelope = f
            .pipeline
            .answer_query("Sandwich sales in Charlotte last week", today(), None)
            .await;

        assert_eq!(envelope.status, QueryStatus::Success);

        let prompts = f.llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("product_id = 'P-210'"));
        assert!(prompts[0].contains("store_id = 'S-044'"));
        // "last week" against 2026-01-20 is the 7 preceding days.
        assert!(prompts[0].contains("2026-01-13"));
        assert!(prompts[0].contains("2026-01-19"));
    }

    #[tokio::test]
    async fn test_unreachable_graph_still_answers() {
        let f = fixture(
            vec![(
                EntityKind::Product,
                "sandwich",
                hit("P-210", "Club Sandwich", 0.86),
            )],
            "SELECT SUM(sales_units) FROM sales WHERE product_id = 'P-210'",
            vec![count_row(7)],
            Arc::new(FailingExpander),
        );

        let envelope = f.pipeline.answer_query("sandwich units", today(), None).await;

        assert_eq!(envelope.status, QueryStatus::Success);
        let prompts = f.llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("product_id = 'P-210'"));
    }

    #[tokio::test]
    async fn test_mutating_statement_never_reaches_executor() {
        let f = fixture(
            vec![],
            "DROP TABLE sales;",
            vec![count_row(1)],
            Arc::new(NoopExpander),
        );

        let envelope = f.pipeline.answer_query("drop everything", today(), None).await;

        assert_eq!(envelope.status, QueryStatus::Error);
        assert_eq!(f.executor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            envelope.error_detail.as_deref(),
            Some("generated SQL failed validation")
        );
        // The failed candidate is still reported as the best-effort
        // statement.
        assert_eq!(envelope.sql_text, "DROP TABLE sales;");
    }

    #[tokio::test]
    async fn test_zero_rows_is_no_data_not_error() {
        let f = fixture(
            vec![],
            "SELECT store_id FROM sales WHERE date = '1999-01-01'",
            Vec::new(),
            Arc::new(NoopExpander),
        );

        let envelope = f.pipeline.answer_query("ancient sales", today(), None).await;

        assert_eq!(envelope.status, QueryStatus::NoData);
        assert!(envelope.error_detail.is_none());
        assert_eq!(f.executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_same_question_builds_the_same_prompt() {
        let f = fixture(
            vec![(
                EntityKind::Product,
                "sandwich",
                hit("P-210", "Club Sandwich", 0.86),
            )],
            "SELECT 1",
            vec![count_row(1)],
            Arc::new(NoopExpander),
        );

        let query = "overstocked sandwich in the northeast region last week";
        f.pipeline.answer_query(query, today(), None).await;
        f.pipeline.answer_query(query, today(), None).await;

        let prompts = f.llm.prompts.lock().unwrap();
        assert_eq!(prompts[0], prompts[1]);
    }
}
