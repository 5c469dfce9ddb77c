use crate::db::database::{Database, Session};
use crate::db::db_utils::{query_rows, render_tuple};
use crate::db::schema_manager::{describe_tables, list_tables, TableDescription};
use crate::db::DbError;
use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Timed out after {0:?} waiting for a database connection")]
    Timeout(Duration),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Database access shared by the agent's tools.
#[derive(Clone)]
pub struct SqlDatabaseToolkit {
    database: Database,
    connect_timeout: Duration,
    sample_rows: usize,
}

impl SqlDatabaseToolkit {
    pub fn new(database: Database, connect_timeout: Duration, sample_rows: usize) -> Self {
        Self {
            database,
            connect_timeout,
            sample_rows,
        }
    }

    pub fn list_tables_tool(&self) -> ListTablesTool {
        ListTablesTool {
            toolkit: self.clone(),
        }
    }

    pub fn schema_tool(&self) -> SchemaTool {
        SchemaTool {
            toolkit: self.clone(),
        }
    }

    pub fn query_tool(&self) -> QueryTool {
        QueryTool {
            toolkit: self.clone(),
        }
    }

    /// Runs `work` on a fresh session in a blocking task; the session closes afterwards.
    /// Only acquiring the session is bounded by the connect timeout.
    async fn with_session<F, T>(&self, work: F) -> Result<T, ToolError>
    where
        F: FnOnce(&Session) -> T + Send + 'static,
        T: Send + 'static,
    {
        let database = self.database.clone();
        let opening = tokio::task::spawn_blocking(move || database.open_session());
        let session = match tokio::time::timeout(self.connect_timeout, opening).await {
            Ok(joined) => joined??,
            Err(_) => return Err(ToolError::Timeout(self.connect_timeout)),
        };

        let result = tokio::task::spawn_blocking(move || -> Result<T, DbError> {
            let result = work(&session);
            session.close()?;
            Ok(result)
        })
        .await??;
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
pub struct NoArgs {}

#[derive(Debug, Deserialize)]
pub struct SchemaArgs {
    /// Comma-separated table names.
    pub table_names: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryArgs {
    pub query: String,
}

pub struct ListTablesTool {
    toolkit: SqlDatabaseToolkit,
}

impl Tool for ListTablesTool {
    const NAME: &'static str = "sql_db_list_tables";
    type Error = ToolError;
    type Args = NoArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Returns a comma-separated list of the tables in the database.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    async fn call(&self, _args: Self::Args) -> Result<Self::Output, Self::Error> {
        info!("Agent tool {} invoked", Self::NAME);
        let tables = self.toolkit.with_session(list_tables).await??;
        Ok(tables.join(", "))
    }
}

pub struct SchemaTool {
    toolkit: SqlDatabaseToolkit,
}

impl Tool for SchemaTool {
    const NAME: &'static str = "sql_db_schema";
    type Error = ToolError;
    type Args = SchemaArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Returns the schema and sample rows for the given tables. \
                Be sure the tables exist by calling sql_db_list_tables first."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "table_names": {
                        "type": "string",
                        "description": "Comma-separated list of tables, e.g. `table1, table2`"
                    }
                },
                "required": ["table_names"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        info!("Agent tool {} invoked for: {}", Self::NAME, args.table_names);
        let tables: Vec<String> = args
            .table_names
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let sample_rows = self.toolkit.sample_rows;
        let description = self
            .toolkit
            .with_session(move |session| describe_tables(session, &tables, sample_rows))
            .await??;

        Ok(match description {
            TableDescription::Found(info) => info,
            TableDescription::Missing(missing) => {
                format!("Error: table_names {:?} not found in database", missing)
            }
        })
    }
}

pub struct QueryTool {
    toolkit: SqlDatabaseToolkit,
}

impl Tool for QueryTool {
    const NAME: &'static str = "sql_db_query";
    type Error = ToolError;
    type Args = QueryArgs;
    type Output = String;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Executes a SQL query against the database and returns the rows. \
                If the query is not correct, an error message is returned; rewrite the query and try again."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "A detailed and correct SQL query."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        info!("Agent tool {} invoked: {}", Self::NAME, args.query);
        let result = self
            .toolkit
            .with_session(move |session| {
                session
                    .connection()
                    .and_then(|conn| query_rows(conn, &args.query).map_err(DbError::from))
            })
            .await?;

        // Query errors go back to the model so it can correct itself
        Ok(match result {
            Ok(set) => {
                let rows: Vec<String> = set.rows.iter().map(|row| render_tuple(row)).collect();
                format!("[{}]", rows.join(", "))
            }
            Err(e) => format!("Error: {}", e),
        })
    }
}
