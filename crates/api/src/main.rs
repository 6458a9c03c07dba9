mod config;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::ServiceConfig;
use executor::{PostgresExecutor, ResultEnvelope, SqlExecutor};
use graph::{Expander, Neo4jExpander, NoopExpander};
use pipeline::{AnswerPipeline, PipelineConfig};
use resolve::{EmbeddingCache, EmbeddingClient, EntityResolver, VectorIndexClient};
use synth::{LlmClient, Synthesizer};

struct AppState {
    pipeline: AnswerPipeline,
    pool: sqlx::PgPool,
}

#[derive(Deserialize)]
struct QueryRequest {
    question: String,
    /// Defaults to today when omitted. Tests and replayed sessions
    /// pass it explicitly.
    current_date: Option<NaiveDate>,
    session_hint: Option<BTreeSet<String>>,
}

#[derive(Serialize)]
struct HealthResponse {
    database: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServiceConfig::from_env()?;
    let pipeline_config = PipelineConfig::default();
    let timeouts = &pipeline_config.timeouts;

    let embedding_client = EmbeddingClient::new(
        config.embedding_url.clone(),
        config.embedding_model.clone(),
        Duration::from_secs(timeouts.embedding_secs),
    )?;
    let embedding_cache = Arc::new(EmbeddingCache::new(pipeline_config.embedding_cache_entries));

    let search = VectorIndexClient::new(
        config.search_url.clone(),
        config.product_collection.clone(),
        config.location_collection.clone(),
        embedding_client,
        embedding_cache,
        Duration::from_secs(timeouts.search_secs),
    )?;
    let resolver = EntityResolver::new(Arc::new(search), pipeline_config.resolver.clone());

    // Capability check: the expander is chosen once, here, not probed
    // per call.
    let expander: Arc<dyn Expander> = match &config.graph {
        Some(graph_config) => {
            let neo4j = neo4rs::Graph::new(
                &graph_config.uri,
                &graph_config.user,
                &graph_config.password,
            )
            .await
            .context("Failed to connect to Neo4j")?;
            Arc::new(Neo4jExpander::new(
                neo4j,
                pipeline_config.expander.clone(),
                Duration::from_secs(timeouts.graph_secs),
            ))
        }
        None => {
            tracing::info!("No graph backend configured, sibling expansion disabled");
            Arc::new(NoopExpander)
        }
    };

    let llm = LlmClient::new(
        config.llm_url.clone(),
        config.llm_model.clone(),
        pipeline_config.llm_temperature,
        Duration::from_secs(timeouts.llm_secs),
    )?;
    let synthesizer = Synthesizer::new(Arc::new(llm), pipeline_config.prompt.row_limit)?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;
    let sql_executor: Arc<dyn SqlExecutor> = Arc::new(PostgresExecutor::new(
        pool.clone(),
        Duration::from_secs(timeouts.statement_secs),
        pipeline_config.max_result_rows,
    ));

    let answer_pipeline = AnswerPipeline::new(
        resolver,
        expander,
        synthesizer,
        sql_executor,
        pipeline_config.prompt.clone(),
    );

    let state = Arc::new(AppState {
        pipeline: answer_pipeline,
        pool,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/query", post(answer_query))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = config.bind_addr.as_str(), "Server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    };
    Json(HealthResponse { database })
}

async fn answer_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Json<ResultEnvelope> {
    let current_date = req
        .current_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let envelope = state
        .pipeline
        .answer_query(&req.question, current_date, req.session_hint)
        .await;

    Json(envelope)
}
