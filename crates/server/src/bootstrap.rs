use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use vendorlink_agent::concierge::{Concierge, NoContextRetriever};
use vendorlink_agent::llm::{LlmError, OpenAiCompatClient};
use vendorlink_agent::session::SessionStore;
use vendorlink_agent::AgentGraph;
use vendorlink_core::config::{AppConfig, ConfigError};
use vendorlink_db::repositories::SqlVendorRepository;
use vendorlink_db::{connect, migrations, DbPool};

use crate::routes::ApiState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: ApiState<OpenAiCompatClient, SqlVendorRepository, NoContextRetriever>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client construction failed: {0}")]
    Llm(#[source] LlmError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let llm = Arc::new(OpenAiCompatClient::new(&config.llm).map_err(BootstrapError::Llm)?);
    let repository = Arc::new(SqlVendorRepository::new(db_pool.clone()));
    let sessions = Arc::new(SessionStore::new(Duration::from_secs(config.session.ttl_secs)));

    let state = ApiState {
        graph: Arc::new(AgentGraph::new(llm.clone(), repository, sessions)),
        concierge: Arc::new(Concierge::new(llm, Arc::new(NoContextRetriever))),
        db_pool: db_pool.clone(),
    };

    Ok(Application { config, db_pool, state })
}
