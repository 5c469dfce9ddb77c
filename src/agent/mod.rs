pub mod prompt;
pub mod tools;

use crate::config::AppConfig;
use crate::db::database::Database;
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::{Prompt, PromptError};
use rig::providers::azure;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use self::prompt::sql_agent_preamble;
use self::tools::SqlDatabaseToolkit;

/// SQL dialect the agent is told to write.
pub const DIALECT: &str = "DuckDB";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent configuration error: {0}")]
    Config(String),

    #[error("Agent run failed: {0}")]
    Prompt(#[from] PromptError),
}

/// Answers a question by letting a model inspect and query the database on its own.
#[async_trait]
pub trait SqlAgent: Send + Sync {
    async fn run(&self, question: &str) -> Result<String, AgentError>;
}

/// Tool-using agent on Azure OpenAI chat completions.
pub struct RigSqlAgent {
    client: azure::Client,
    deployment: String,
    toolkit: SqlDatabaseToolkit,
    top_k: usize,
    max_iterations: usize,
}

impl RigSqlAgent {
    pub fn new(config: &AppConfig, database: Database) -> Result<Self, AgentError> {
        let openai = &config.openai;
        let auth = match openai.api_type.to_lowercase().as_str() {
            "azure" => azure::AzureOpenAIAuth::ApiKey(openai.api_key.clone()),
            "azure_ad" => azure::AzureOpenAIAuth::Token(openai.api_key.clone()),
            other => {
                return Err(AgentError::Config(format!(
                    "The agent requires an Azure OpenAI endpoint, got API type: {}",
                    other
                )))
            }
        };

        reqwest::Url::parse(&openai.api_base).map_err(|e| {
            AgentError::Config(format!("Invalid API base {:?}: {}", openai.api_base, e))
        })?;

        let client = azure::Client::builder(auth, &openai.api_base)
            .api_version(&openai.api_version)
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))?;

        let toolkit = SqlDatabaseToolkit::new(
            database,
            Duration::from_secs(config.database.connect_timeout_secs),
            config.agent.sample_rows,
        );

        Ok(Self {
            client,
            deployment: config.agent_deployment().to_string(),
            toolkit,
            top_k: config.agent.top_k,
            max_iterations: config.agent.max_iterations,
        })
    }
}

/// Stands in for an agent that could not be built, so `/sqlprompt` keeps serving.
pub struct UnavailableAgent {
    reason: String,
}

impl UnavailableAgent {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SqlAgent for UnavailableAgent {
    async fn run(&self, _question: &str) -> Result<String, AgentError> {
        Err(AgentError::Config(self.reason.clone()))
    }
}

/// Builds the agent, deferring a configuration failure to request time.
pub fn build_agent(config: &AppConfig, database: Database) -> Arc<dyn SqlAgent> {
    match RigSqlAgent::new(config, database) {
        Ok(agent) => Arc::new(agent),
        Err(e) => {
            warn!("SQL agent unavailable, /langprompt will fail: {}", e);
            Arc::new(UnavailableAgent::new(e.to_string()))
        }
    }
}

#[async_trait]
impl SqlAgent for RigSqlAgent {
    async fn run(&self, question: &str) -> Result<String, AgentError> {
        info!("Creating SQL agent on deployment {}", self.deployment);
        let agent = self
            .client
            .agent(&self.deployment)
            .preamble(&sql_agent_preamble(DIALECT, self.top_k))
            .tool(self.toolkit.list_tables_tool())
            .tool(self.toolkit.schema_tool())
            .tool(self.toolkit.query_tool())
            .build();

        info!("Running SQL agent with received prompt");
        let response = agent.prompt(question).multi_turn(self.max_iterations).await?;

        info!("--- Response");
        info!("{}", response);
        info!("--- End of Response ---");
        Ok(response)
    }
}
