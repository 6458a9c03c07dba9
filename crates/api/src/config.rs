use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub embedding_url: String,
    pub embedding_model: String,
    pub search_url: String,
    pub product_collection: String,
    pub location_collection: String,
    pub llm_url: String,
    pub llm_model: String,
    /// `None` means no graph backend is configured; the pipeline runs
    /// with sibling expansion disabled.
    pub graph: Option<GraphConfig>,
    pub database_url: String,
}

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let graph = env::var("NEO4J_URI").ok().map(|uri| GraphConfig {
            uri,
            user: env_or("NEO4J_USER", "neo4j"),
            password: env::var("NEO4J_PASSWORD").unwrap_or_default(),
        });

        Ok(Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
            embedding_url: env_or("EMBEDDING_URL", "http://localhost:11434"),
            embedding_model: env_or("EMBEDDING_MODEL", "nomic-embed-text"),
            search_url: env_or("SEARCH_URL", "http://localhost:6333"),
            product_collection: env_or("PRODUCT_COLLECTION", "products"),
            location_collection: env_or("LOCATION_COLLECTION", "locations"),
            llm_url: env_or("LLM_URL", "http://localhost:11434"),
            llm_model: env_or("LLM_MODEL", "llama3"),
            graph,
            database_url,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
