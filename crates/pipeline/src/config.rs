use graph::ExpanderConfig;
use promptgen::PromptConfig;
use resolve::ResolverConfig;

/// All pipeline tunables in one place. The api crate reads this when
/// wiring real backends; tests construct the pieces directly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub resolver: ResolverConfig,
    pub expander: ExpanderConfig,
    pub prompt: PromptConfig,
    pub timeouts: TimeoutConfig,
    /// Hard cap on rows kept from any statement, independent of the
    /// LIMIT the model writes.
    pub max_result_rows: usize,
    pub llm_temperature: f32,
    pub embedding_cache_entries: usize,
}

#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub embedding_secs: u64,
    pub search_secs: u64,
    pub graph_secs: u64,
    pub llm_secs: u64,
    pub statement_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            expander: ExpanderConfig::default(),
            prompt: PromptConfig::default(),
            timeouts: TimeoutConfig {
                embedding_secs: 10,
                search_secs: 10,
                graph_secs: 10,
                llm_secs: 60,
                statement_secs: 30,
            },
            max_result_rows: 500,
            llm_temperature: 0.1,
            embedding_cache_entries: 10000,
        }
    }
}
