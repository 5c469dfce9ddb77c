use crate::db::database::Session;
use crate::db::db_utils::{query_rows, render_value};
use crate::db::DbError;
use crate::llm::prompt::SEED_TOKEN;
use duckdb::types::Value;
use tracing::{debug, info};

/// Result of running a generated query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryOutcome {
    /// First column of the first row, as text. `None` when there is no such cell.
    pub fn scalar(&self) -> Option<String> {
        self.rows.first().and_then(|row| row.first()).map(render_value)
    }
}

/// Prefixes the seed token and flattens line breaks into spaces.
pub fn generated_query(completion: &str) -> String {
    format!("{}{}", SEED_TOKEN, completion).replace(['\n', '\r'], " ")
}

/// Runs the statement exactly as generated: no validation, no read-only guard.
pub fn execute(session: &Session, sql: &str) -> Result<QueryOutcome, DbError> {
    let set = query_rows(session.connection()?, sql)?;
    info!("Query executed");
    debug!("Final Result : {:?}", set.rows);

    Ok(QueryOutcome {
        columns: set.columns,
        rows: set.rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::database::Database;

    #[test]
    fn seed_token_is_prefixed() {
        assert_eq!(
            generated_query(" AVG(Salary) FROM Employees"),
            "SELECT AVG(Salary) FROM Employees"
        );
        assert!(generated_query("").starts_with("SELECT"));
    }

    #[test]
    fn line_breaks_become_spaces() {
        assert_eq!(
            generated_query(" Name\nFROM Employees\r\nWHERE Salary > 10"),
            "SELECT Name FROM Employees  WHERE Salary > 10"
        );
        // nothing but line breaks changes
        assert_eq!(generated_query(" 'a\tb'  x"), "SELECT 'a\tb'  x");
    }

    #[test]
    fn extracts_first_cell() {
        let db = Database::in_memory().unwrap();
        let session = db.open_session().unwrap();

        let outcome = execute(&session, "SELECT 42 AS answer, 'ignored' UNION ALL SELECT 7, 'x'").unwrap();
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.columns[0], "answer");
        assert_eq!(outcome.scalar().as_deref(), Some("42"));
    }

    #[test]
    fn empty_result_has_no_scalar() {
        let db = Database::in_memory().unwrap();
        let session = db.open_session().unwrap();

        let outcome = execute(&session, "SELECT 1 WHERE 1 = 0").unwrap();
        assert!(outcome.rows.is_empty());
        assert_eq!(outcome.scalar(), None);
    }

    #[test]
    fn invalid_sql_is_an_error() {
        let db = Database::in_memory().unwrap();
        let session = db.open_session().unwrap();

        let err = execute(&session, "SELECT FROM WHERE").unwrap_err();
        assert!(matches!(err, DbError::DuckDb(_)));
    }
}
