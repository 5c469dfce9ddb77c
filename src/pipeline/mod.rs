pub mod executor;

use crate::db::database::Database;
use crate::db::schema_manager::fetch_schema_snapshot;
use crate::db::DbError;
use crate::llm::prompt::{PromptComposer, SeedPromptComposer};
use crate::llm::{LlmError, LlmManager};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Completion(#[from] LlmError),

    #[error("Failed to serialize schema snapshot: {0}")]
    Prompt(#[from] serde_json::Error),

    #[error("The generated query returned no rows: {sql}")]
    EmptyResult { sql: String },

    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The answer returned for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseRecord {
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "SQLQuery")]
    pub sql_query: String,
    #[serde(rename = "Response")]
    pub response: String,
}

impl ResponseRecord {
    pub fn assemble(question: &str, sql_query: String, response: String) -> Self {
        Self {
            question: question.to_string(),
            sql_query,
            response,
        }
    }
}

/// Schema snapshot → prompt → completion → execution → record.
#[derive(Clone)]
pub struct SqlPromptPipeline {
    database: Database,
    llm: LlmManager,
    composer: Arc<dyn PromptComposer>,
}

impl SqlPromptPipeline {
    pub fn new(database: Database, llm: LlmManager) -> Self {
        Self {
            database,
            llm,
            composer: Arc::new(SeedPromptComposer),
        }
    }

    pub fn with_composer(mut self, composer: Arc<dyn PromptComposer>) -> Self {
        self.composer = composer;
        self
    }

    pub async fn answer(&self, question: &str) -> Result<ResponseRecord, PipelineError> {
        let database = self.database.clone();
        let (session, schema) = tokio::task::spawn_blocking(move || -> Result<_, DbError> {
            let session = database.open_session()?;
            let schema = fetch_schema_snapshot(&session)?;
            Ok((session, schema))
        })
        .await??;

        let prompt = self.composer.compose(&schema, question)?;
        debug!("prompt : {}", prompt);

        // On failure the session drops here and closes
        let completion = self.llm.complete(&prompt).await?;
        debug!("Completion: {}", completion);

        let sql = executor::generated_query(&completion);
        info!("SQLQuery: {}", sql);

        let statement = sql.clone();
        let outcome = tokio::task::spawn_blocking(move || -> Result<_, DbError> {
            let outcome = executor::execute(&session, &statement);
            if let Err(e) = session.close() {
                warn!("Failed to close database session: {}", e);
            }
            outcome
        })
        .await??;

        let Some(scalar) = outcome.scalar() else {
            return Err(PipelineError::EmptyResult { sql });
        };
        info!("Final Output after Parsing : {}", scalar);

        Ok(ResponseRecord::assemble(question, sql, scalar))
    }
}
