use crate::config::Config;
use crate::storage::{MongoStore, Store};
use mongodb::Client as MongoClient;
use std::sync::Arc;

use gemini_client::{AssessmentClient, GeminiClient};
use session_service::SessionRegistry;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub assessor: Arc<dyn AssessmentClient>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);
        let store = MongoStore::new(mongo);

        tracing::info!("Ensuring MongoDB indexes...");
        tokio::time::timeout(std::time::Duration::from_secs(30), store.ensure_indexes())
            .await
            .map_err(|_| anyhow::anyhow!("MongoDB index creation timeout after 30s"))??;

        let assessor: Arc<dyn AssessmentClient> =
            Arc::from(GeminiClient::from_config(&config.assessment)?);

        Ok(Self::with_parts(config, Arc::new(store), assessor))
    }

    /// State over caller-supplied backends, e.g. the in-memory store.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn Store>,
        assessor: Arc<dyn AssessmentClient>,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(config.session_idle_timeout()));
        Self {
            config,
            store,
            assessor,
            sessions,
        }
    }
}

pub mod assessment_service;
pub mod attempt_service;
pub mod dashboard_service;
pub mod gemini_client;
pub mod session_service;
pub mod usage_service;
