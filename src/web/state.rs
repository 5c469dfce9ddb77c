use crate::agent::SqlAgent;
use crate::pipeline::SqlPromptPipeline;
use std::sync::Arc;

/// Shared application state for the web server. Read-only after startup.
pub struct AppState {
    pub pipeline: SqlPromptPipeline,
    pub agent: Arc<dyn SqlAgent>,
}

impl AppState {
    pub fn new(pipeline: SqlPromptPipeline, agent: Arc<dyn SqlAgent>) -> Self {
        Self { pipeline, agent }
    }
}
