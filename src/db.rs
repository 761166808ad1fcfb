use crate::error::{EtlError, EtlResult};
use crate::progress::ProgressLogger;
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Final row shape shared by the CSV file and the database table.
/// Serde names double as the column names in both sinks.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EnrichedBankRow {
    #[serde(rename = "rank")]
    pub rank: u32,

    #[serde(rename = "bankName")]
    pub bank_name: String,

    #[serde(rename = "marketCapUSDBillion")]
    pub market_cap_usd_billion: f64,

    #[serde(rename = "marketCapGBPBillion")]
    pub market_cap_gbp_billion: f64,

    #[serde(rename = "marketCapEURBillion")]
    pub market_cap_eur_billion: f64,

    #[serde(rename = "marketCapINRBillion")]
    pub market_cap_inr_billion: f64,
}

pub const COLUMNS: [(&str, &str); 6] = [
    ("rank", "INTEGER"),
    ("bankName", "TEXT"),
    ("marketCapUSDBillion", "REAL"),
    ("marketCapGBPBillion", "REAL"),
    ("marketCapEURBillion", "REAL"),
    ("marketCapINRBillion", "REAL"),
];

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ============================================================================
// CONNECTION SCOPE
// ============================================================================

/// Open the store, run `work`, then close explicitly.
///
/// If `work` fails the connection is dropped (and released) before the error
/// propagates; the "closed" event is only logged on a clean close.
pub fn with_connection<T, F>(db_path: &Path, logger: &ProgressLogger, work: F) -> EtlResult<T>
where
    F: FnOnce(&mut Connection) -> EtlResult<T>,
{
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| EtlError::sink_write("database", e))?;
    }

    let mut conn = Connection::open(db_path).map_err(|source| EtlError::Connection {
        path: db_path.to_path_buf(),
        source,
    })?;
    logger.log("SQL Connection initiated")?;

    let value = work(&mut conn)?;

    conn.close().map_err(|(_, source)| EtlError::Connection {
        path: db_path.to_path_buf(),
        source,
    })?;
    logger.log("Server Connection closed")?;

    Ok(value)
}

// ============================================================================
// RELATIONAL SINK
// ============================================================================

/// Full-replace load: drop, recreate and fill `table` in one transaction.
/// No primary key; row identity is insertion order.
pub fn replace_table(conn: &mut Connection, table: &str, rows: &[EnrichedBankRow]) -> EtlResult<usize> {
    let to_sink_error = |e: rusqlite::Error| EtlError::sink_write("database", e);
    let quoted = quote_ident(table);

    let column_defs = COLUMNS
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty))
        .collect::<Vec<_>>()
        .join(", ");
    let column_names = COLUMNS
        .iter()
        .map(|(name, _)| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ");

    let tx = conn.transaction().map_err(to_sink_error)?;

    tx.execute(&format!("DROP TABLE IF EXISTS {}", quoted), [])
        .map_err(to_sink_error)?;
    tx.execute(&format!("CREATE TABLE {} ({})", quoted, column_defs), [])
        .map_err(to_sink_error)?;

    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                quoted, column_names
            ))
            .map_err(to_sink_error)?;

        for row in rows {
            stmt.execute(params![
                row.rank,
                row.bank_name,
                row.market_cap_usd_billion,
                row.market_cap_gbp_billion,
                row.market_cap_eur_billion,
                row.market_cap_inr_billion,
            ])
            .map_err(to_sink_error)?;
        }
    }

    tx.commit().map_err(to_sink_error)?;

    info!("Replaced table {} with {} rows", table, rows.len());
    Ok(rows.len())
}

pub fn count_rows(conn: &Connection, table: &str) -> EtlResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    conn.query_row(&sql, [], |row| row.get(0))
        .map_err(|source| EtlError::Query { sql, source })
}

// ============================================================================
// QUERY RUNNER
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Text values of one column, in result order
    pub fn text_column(&self, index: usize) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| match row.get(index) {
                Some(Value::Text(s)) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Renders a result row as a tuple: `('JPMorgan Chase', 432.92)`
pub struct RowDisplay<'a>(pub &'a [Value]);

impl fmt::Display for RowDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Value::Null => write!(f, "NULL")?,
                Value::Integer(n) => write!(f, "{}", n)?,
                // Debug keeps the trailing `.0` on whole numbers
                Value::Real(x) => write!(f, "{:?}", x)?,
                Value::Text(s) if s.contains('\'') && !s.contains('"') => write!(f, "\"{}\"", s)?,
                Value::Text(s) => write!(f, "'{}'", s.replace('\'', "\\'"))?,
                Value::Blob(b) => write!(f, "<{} bytes>", b.len())?,
            }
        }
        write!(f, ")")
    }
}

/// Execute one query, print each row, and log it.
/// Errors come back unmodified as `EtlError::Query`.
pub fn run_query(conn: &Connection, sql: &str, logger: &ProgressLogger) -> EtlResult<QueryResult> {
    let to_query_error = |source| EtlError::Query {
        sql: sql.to_string(),
        source,
    };

    println!("Executing Query: {}", sql);

    let mut stmt = conn.prepare(sql).map_err(to_query_error)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(to_query_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_query_error)?;

    for row in &rows {
        println!("{}", RowDisplay(row));
    }
    debug!("{} rows for {}", rows.len(), sql);

    logger.log(&format!("Query executed: {}", sql))?;

    Ok(QueryResult {
        sql: sql.to_string(),
        columns,
        rows,
    })
}

/// The three fixed reports: whole table, average GBP market cap, top 5 names
pub fn analytical_queries(table: &str) -> Vec<String> {
    let quoted = quote_ident(table);
    vec![
        format!("SELECT * FROM {}", quoted),
        format!("SELECT AVG({}) FROM {}", quote_ident("marketCapGBPBillion"), quoted),
        format!("SELECT {} FROM {} LIMIT 5", quote_ident("bankName"), quoted),
    ]
}
