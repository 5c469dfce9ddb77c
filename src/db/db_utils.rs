use chrono::{DateTime, NaiveDate};
use duckdb::types::{TimeUnit, Value};
use duckdb::Connection;

/// Column names and rows produced by one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Executes `sql` verbatim and collects every row.
pub fn query_rows(conn: &Connection, sql: &str) -> duckdb::Result<RowSet> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;

    let width = rows.as_ref().map(|s| s.column_count()).unwrap_or_default();

    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(row.get::<_, Value>(i)?);
        }
        collected.push(values);
    }
    drop(rows);

    Ok(RowSet {
        columns: stmt.column_names(),
        rows: collected,
    })
}

/// Renders a single value as answer text.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Boolean(v) => v.to_string(),
        Value::TinyInt(v) => v.to_string(),
        Value::SmallInt(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::BigInt(v) => v.to_string(),
        Value::HugeInt(v) => v.to_string(),
        Value::UTinyInt(v) => v.to_string(),
        Value::USmallInt(v) => v.to_string(),
        Value::UInt(v) => v.to_string(),
        Value::UBigInt(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::Text(v) => v.clone(),
        Value::Enum(v) => v.clone(),
        Value::Date32(days) => render_date(*days),
        Value::Timestamp(unit, raw) => render_timestamp(unit, *raw),
        Value::Blob(bytes) => String::from_utf8_lossy(bytes).to_string(),
        other => format!("{:?}", other),
    }
}

fn render_date(days: i32) -> String {
    // 719_163 days separate 0001-01-01 from the Unix epoch
    NaiveDate::from_num_days_from_ce_opt(days + 719_163)
        .map(|d| d.to_string())
        .unwrap_or_else(|| days.to_string())
}

fn render_timestamp(unit: &TimeUnit, raw: i64) -> String {
    let micros = match unit {
        TimeUnit::Second => raw.saturating_mul(1_000_000),
        TimeUnit::Millisecond => raw.saturating_mul(1_000),
        TimeUnit::Microsecond => raw,
        TimeUnit::Nanosecond => raw / 1_000,
    };

    DateTime::from_timestamp_micros(micros)
        .map(|ts| ts.naive_utc().to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Renders a row the way the agent sees query results: `(1, 'Alice', NULL)`.
pub fn render_tuple(row: &[Value]) -> String {
    let cells: Vec<String> = row
        .iter()
        .map(|value| match value {
            Value::Text(s) | Value::Enum(s) => format!("'{}'", s),
            other => render_value(other),
        })
        .collect();

    if cells.len() == 1 {
        format!("({},)", cells[0])
    } else {
        format!("({})", cells.join(", "))
    }
}

/// Double-quotes an identifier, escaping embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
