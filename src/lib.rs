pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::PgPool;

use crate::models::prequal_config::PrequalConfig;
use crate::repository::{PgStore, PrequalStore};
use crate::services::ai_service::{CompletionClient, OpenAiCompletionClient};
use crate::services::prequal_service::PrequalificationService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PrequalStore>,
    pub prequal: PrequalificationService,
}

impl AppState {
    pub fn new(pool: PgPool) -> error::Result<Self> {
        let config = crate::config::get_config();
        let timeout = Duration::from_secs(config.ai_timeout_secs);
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| error::Error::Internal(format!("HTTP client: {}", e)))?;

        let completion = OpenAiCompletionClient::new(
            http_client,
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
            timeout,
        );

        Ok(Self::with_components(
            Arc::new(PgStore::new(pool)),
            Arc::new(completion),
            PrequalConfig::default(),
        ))
    }

    pub fn with_components(
        store: Arc<dyn PrequalStore>,
        completion: Arc<dyn CompletionClient>,
        defaults: PrequalConfig,
    ) -> Self {
        let prequal = PrequalificationService::new(store.clone(), completion, defaults);
        Self { store, prequal }
    }
}
