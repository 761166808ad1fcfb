// Largest Banks ETL - Core Library
// Extract the bank ranking, convert currencies, load CSV + SQLite, run reports

pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod flat_file;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod rates;

// Re-export commonly used types
pub use config::RunConfig;
pub use db::{
    analytical_queries, count_rows, replace_table, run_query, with_connection, EnrichedBankRow,
    QueryResult, RowDisplay,
};
pub use error::{EtlError, EtlResult};
pub use fetch::{DocumentSource, FileSource, HttpSource};
pub use flat_file::{read_csv, write_csv};
pub use parser::{BankRow, BankTableParser};
pub use pipeline::{run, RunSummary};
pub use progress::{LogEvent, ProgressLogger};
pub use rates::{convert, RateTable, TargetCurrency};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
