pub mod models;
pub mod prompt;
pub mod providers;

use crate::config::OpenAiConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),
    #[error("LLM response error: {0}")]
    ResponseError(String),
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// A hosted text-completion model: continues a prompt and returns the text.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Clone)]
pub struct LlmManager {
    model: Arc<dyn CompletionModel>,
}

impl LlmManager {
    pub fn new(config: &OpenAiConfig) -> Result<Self, LlmError> {
        let model = providers::openai::OpenAiCompletionProvider::new(config)?;
        Ok(Self::with_model(Arc::new(model)))
    }

    pub fn with_model(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.model.complete(prompt).await
    }
}
