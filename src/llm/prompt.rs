use crate::db::schema_manager::SchemaEntry;

/// Literal the prompt ends on; the model continues the statement from here.
pub const SEED_TOKEN: &str = "SELECT";

/// Builds the completion prompt from a schema snapshot and a question.
pub trait PromptComposer: Send + Sync {
    fn compose(&self, schema: &[SchemaEntry], question: &str) -> Result<String, serde_json::Error>;
}

/// The fixed T-SQL template. The question is interpolated verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeedPromptComposer;

impl PromptComposer for SeedPromptComposer {
    fn compose(&self, schema: &[SchemaEntry], question: &str) -> Result<String, serde_json::Error> {
        let schema_json = serde_json::to_string(schema)?;
        Ok(format!(
            "# Here are the columns in the database:\n# {}\n### Generate a single T-SQL query for the following question using the information about the database: {}\n\n{}",
            schema_json, question, SEED_TOKEN
        ))
    }
}
