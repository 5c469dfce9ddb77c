use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod agent;
mod config;
mod db;
mod llm;
mod pipeline;
mod util;
mod web;

use crate::agent::build_agent;
use crate::config::{AppConfig, CliArgs};
use crate::db::database::Database;
use crate::llm::LlmManager;
use crate::pipeline::SqlPromptPipeline;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Pick up a local .env before anything reads the environment
    dotenvy::dotenv().ok();

    init_tracing();

    let args = CliArgs::parse();

    // Load configuration; every required setting is checked here
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    config.log_environment();

    info!("Connecting to database ...");
    let database = Database::open(&config.database)?;
    info!("... Database Connection established");

    info!("Initializing completion client for API type: {}", config.openai.api_type);
    let llm_manager = LlmManager::new(&config.openai)?;

    info!("Creating SQL agent");
    let agent = build_agent(&config, database.clone());

    let pipeline = SqlPromptPipeline::new(database, llm_manager);
    let app_state = Arc::new(AppState::new(pipeline, agent));

    info!("Starting SQL prompt server on {}:{}", config.web.host, config.web.port);
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
