use crate::db::database::Session;
use crate::db::db_utils::{query_rows, quote_identifier, render_value};
use crate::db::DbError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Catalog query behind the schema snapshot.
pub const CATALOG_QUERY: &str = "SELECT TABLE_NAME, COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS";

/// One (table, column) pair from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    #[serde(rename = "TABLE_NAME")]
    pub table_name: String,
    #[serde(rename = "COLUMN_NAME")]
    pub column_name: String,
}

impl SchemaEntry {
    pub fn new(table_name: impl Into<String>, column_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            column_name: column_name.into(),
        }
    }
}

/// Every column in the catalog, in catalog order, unfiltered.
pub fn fetch_schema_snapshot(session: &Session) -> Result<Vec<SchemaEntry>, DbError> {
    let conn = session.connection()?;
    let mut stmt = conn.prepare(CATALOG_QUERY)?;
    let entries = stmt
        .query_map([], |row| {
            Ok(SchemaEntry {
                table_name: row.get::<_, String>(0)?,
                column_name: row.get::<_, String>(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    info!("Schema snapshot holds {} columns", entries.len());
    Ok(entries)
}

/// Names of all user tables and views, sorted.
pub fn list_tables(session: &Session) -> Result<Vec<String>, DbError> {
    let conn = session.connection()?;
    let mut stmt = conn.prepare(
        "SELECT DISTINCT table_name FROM information_schema.tables ORDER BY table_name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Found {} tables", tables.len());
    Ok(tables)
}

/// Column name, data type and nullability for one table, in ordinal order.
fn table_columns(session: &Session, table: &str) -> Result<Vec<(String, String, bool)>, DbError> {
    let conn = session.connection()?;
    let mut stmt = conn.prepare(
        "SELECT column_name, data_type, is_nullable
         FROM information_schema.columns
         WHERE table_name = ?
         ORDER BY ordinal_position",
    )?;
    let columns = stmt
        .query_map(duckdb::params![table], |row| {
            Ok((
                row.get::<_, String>(0)?,          // column_name
                row.get::<_, String>(1)?,          // data_type
                row.get::<_, String>(2)? == "YES", // is_nullable
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Outcome of describing a set of tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableDescription {
    Found(String),
    /// Requested tables that do not exist; nothing is described.
    Missing(Vec<String>),
}

/// DDL plus a few sample rows for each named table.
pub fn describe_tables(
    session: &Session,
    tables: &[String],
    sample_rows: usize,
) -> Result<TableDescription, DbError> {
    let known = list_tables(session)?;
    let missing: Vec<String> = tables
        .iter()
        .filter(|t| !known.contains(t))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Ok(TableDescription::Missing(missing));
    }

    let mut blocks = Vec::new();
    for table_name in tables {
        let columns = table_columns(session, table_name)?;

        let mut create_table = format!("CREATE TABLE {} (\n", quote_identifier(table_name));
        for (i, (name, data_type, nullable)) in columns.iter().enumerate() {
            let null_str = if *nullable { "" } else { " NOT NULL" };
            create_table.push_str(&format!("\t{} {}{}", quote_identifier(name), data_type, null_str));
            if i < columns.len() - 1 {
                create_table.push_str(",\n");
            } else {
                create_table.push('\n');
            }
        }
        create_table.push(')');

        if sample_rows > 0 {
            let sample = query_rows(
                session.connection()?,
                &format!("SELECT * FROM {} LIMIT {}", quote_identifier(table_name), sample_rows),
            )?;

            create_table.push_str(&format!(
                "\n\n/*\n{} rows from {} table:\n{}\n",
                sample_rows,
                table_name,
                sample.columns.join("\t")
            ));
            for row in &sample.rows {
                let cells: Vec<String> = row.iter().map(render_value).collect();
                create_table.push_str(&cells.join("\t"));
                create_table.push('\n');
            }
            create_table.push_str("*/");
        }

        blocks.push(create_table);
    }

    Ok(TableDescription::Found(blocks.join("\n\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::database::Database;

    fn seeded() -> Database {
        let db = Database::in_memory().unwrap();
        let session = db.open_session().unwrap();
        session
            .connection()
            .unwrap()
            .execute_batch(
                "CREATE TABLE Employees (Name VARCHAR NOT NULL, Salary INTEGER);
                 INSERT INTO Employees VALUES ('Ada', 1000), ('Grace', 3000);
                 CREATE TABLE Departments (Name VARCHAR);",
            )
            .unwrap();
        session.close().unwrap();
        db
    }

    #[test]
    fn snapshot_has_one_entry_per_column() {
        let db = seeded();
        let session = db.open_session().unwrap();
        let snapshot = fetch_schema_snapshot(&session).unwrap();

        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.contains(&SchemaEntry::new("Employees", "Salary")));
        // Column names recur across tables without dedup
        assert_eq!(snapshot.iter().filter(|e| e.column_name == "Name").count(), 2);
    }

    #[test]
    fn snapshot_keeps_catalog_order() {
        let db = seeded();
        let session = db.open_session().unwrap();
        let snapshot = fetch_schema_snapshot(&session).unwrap();

        let conn = session.connection().unwrap();
        let mut stmt = conn
            .prepare("SELECT TABLE_NAME, COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS")
            .unwrap();
        let catalog: Vec<SchemaEntry> = stmt
            .query_map([], |row| {
                Ok(SchemaEntry::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(snapshot, catalog);
    }

    #[test]
    fn snapshot_serializes_with_catalog_keys() {
        let json = serde_json::to_string(&[SchemaEntry::new("Employees", "Name")]).unwrap();
        assert_eq!(json, r#"[{"TABLE_NAME":"Employees","COLUMN_NAME":"Name"}]"#);
    }

    #[test]
    fn lists_tables_sorted() {
        let db = seeded();
        let session = db.open_session().unwrap();
        assert_eq!(
            list_tables(&session).unwrap(),
            vec!["Departments".to_string(), "Employees".to_string()]
        );
    }

    #[test]
    fn describes_tables_with_samples() {
        let db = seeded();
        let session = db.open_session().unwrap();
        let TableDescription::Found(info) =
            describe_tables(&session, &["Employees".to_string()], 3).unwrap()
        else {
            panic!("Employees should be described");
        };

        assert!(info.starts_with("CREATE TABLE \"Employees\" (\n\t\"Name\" VARCHAR NOT NULL,\n\t\"Salary\" INTEGER\n)"));
        assert!(info.contains("3 rows from Employees table:\nName\tSalary\n"));
        assert!(info.contains("Grace\t3000"));
    }

    #[test]
    fn reports_unknown_tables() {
        let db = seeded();
        let session = db.open_session().unwrap();
        assert_eq!(
            describe_tables(&session, &["Payroll".to_string()], 3).unwrap(),
            TableDescription::Missing(vec!["Payroll".to_string()])
        );
    }
}
