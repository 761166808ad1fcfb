// 🔁 Orchestrator - EXTRACT → TRANSFORM → LOAD → QUERY, once, in order
//
// The first error aborts the run. Whatever was already written (CSV file,
// database table, progress log) stays as it is.

use crate::config::RunConfig;
use crate::db::{self, EnrichedBankRow, QueryResult};
use crate::error::EtlResult;
use crate::fetch::DocumentSource;
use crate::flat_file;
use crate::parser::{BankRow, BankTableParser};
use crate::progress::ProgressLogger;
use crate::rates::{self, RateTable};
use tracing::{info, warn};

/// Row whose EUR market cap is echoed to the console
pub const EUR_SAMPLE_INDEX: usize = 4;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: Vec<EnrichedBankRow>,
    pub eur_sample: Option<f64>,
    pub loaded: usize,
    pub queries: Vec<QueryResult>,
}

pub fn run(config: &RunConfig, source: &dyn DocumentSource) -> EtlResult<RunSummary> {
    let logger = ProgressLogger::new(&config.log_path);
    logger.log("Preliminaries complete. Initiating ETL process")?;

    // EXTRACT
    info!("Extracting section {} via {}", config.section_id, source.describe());
    let document = source.fetch(&config.source_url)?;
    let extracted = BankTableParser::from_config(config).parse(&document)?;
    print_extracted(&extracted);
    logger.log("Data extraction complete. Initiating Transformation process")?;

    // TRANSFORM
    let rate_table = RateTable::from_csv(&config.rate_path)?;
    let rows = rates::convert(&extracted, &rate_table)?;
    logger.log("Data transformation complete. Initiating Loading process")?;

    let eur_sample = rows.get(EUR_SAMPLE_INDEX).map(|r| r.market_cap_eur_billion);
    match eur_sample {
        Some(value) => println!("{:?}", value),
        None => warn!(
            "Only {} rows extracted; no row at index {} to sample",
            rows.len(),
            EUR_SAMPLE_INDEX
        ),
    }

    // LOAD
    flat_file::write_csv(&rows, &config.csv_out_path)?;
    logger.log("Data saved to CSV file")?;
    println!("Data saved to CSV successfully.");

    let loaded = db::with_connection(&config.db_path, &logger, |conn| {
        let loaded = db::replace_table(conn, &config.table_name, &rows)?;
        logger.log("Data loaded to Database as a table, Executing queries")?;
        println!("Data loaded to Database successfully.");
        Ok(loaded)
    })?;

    // QUERY
    let queries = db::with_connection(&config.db_path, &logger, |conn| {
        db::analytical_queries(&config.table_name)
            .iter()
            .map(|sql| db::run_query(conn, sql, &logger))
            .collect::<EtlResult<Vec<_>>>()
    })?;

    logger.log("Process Complete")?;

    Ok(RunSummary {
        rows,
        eur_sample,
        loaded,
        queries,
    })
}

/// Console dump of the extracted table
pub fn print_extracted(rows: &[BankRow]) {
    let name_width = rows
        .iter()
        .map(|r| r.bank_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Bank name".len());

    println!(
        "{:>4}  {:<width$}  {:>24}",
        "Rank",
        "Bank name",
        "Market cap (US$ billion)",
        width = name_width
    );
    for row in rows {
        println!(
            "{:>4}  {:<width$}  {:>24.2}",
            row.rank,
            row.bank_name,
            row.market_cap_usd_billion,
            width = name_width
        );
    }
    println!("[{} rows x 3 columns]", rows.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::fetch::FileSource;
    use crate::progress::read_events;
    use rusqlite::Connection;
    use std::path::Path;

    const FIXTURE_HTML: &str = "tests/fixtures/largest_banks.html";
    const FIXTURE_RATES: &str = "tests/fixtures/exchange_rate.csv";

    fn config_in(dir: &Path) -> RunConfig {
        RunConfig {
            source_file: Some(FIXTURE_HTML.into()),
            rate_path: FIXTURE_RATES.into(),
            csv_out_path: dir.join("largest_banks.csv"),
            db_path: dir.join("Banks.db"),
            log_path: dir.join("code_log.txt"),
            ..RunConfig::default()
        }
    }

    fn messages(path: &Path) -> Vec<String> {
        read_events(path).unwrap().into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn test_full_run_offline() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let summary = run(&config, &FileSource::new(FIXTURE_HTML)).unwrap();

        assert_eq!(summary.rows.len(), 10);
        assert_eq!(summary.loaded, 10);
        assert_eq!(summary.eur_sample, Some(146.86));

        // Both sinks hold the same rows
        let csv_rows = flat_file::read_csv(&config.csv_out_path).unwrap();
        assert_eq!(csv_rows, summary.rows);

        let conn = Connection::open(&config.db_path).unwrap();
        assert_eq!(db::count_rows(&conn, &config.table_name).unwrap(), 10);

        assert_eq!(summary.queries.len(), 3);
        assert_eq!(summary.queries[0].rows.len(), 10);
        assert_eq!(
            summary.queries[2].text_column(0),
            vec![
                "JPMorgan Chase",
                "Bank of America",
                "Industrial and Commercial Bank of China",
                "Agricultural Bank of China",
                "HSBC Holdings PLC",
            ]
        );

        let sql = db::analytical_queries(&config.table_name);
        assert_eq!(
            messages(&config.log_path),
            vec![
                "Preliminaries complete. Initiating ETL process".to_string(),
                "Data extraction complete. Initiating Transformation process".to_string(),
                "Data transformation complete. Initiating Loading process".to_string(),
                "Data saved to CSV file".to_string(),
                "SQL Connection initiated".to_string(),
                "Data loaded to Database as a table, Executing queries".to_string(),
                "Server Connection closed".to_string(),
                "SQL Connection initiated".to_string(),
                format!("Query executed: {}", sql[0]),
                format!("Query executed: {}", sql[1]),
                format!("Query executed: {}", sql[2]),
                "Server Connection closed".to_string(),
                "Process Complete".to_string(),
            ]
        );
    }

    #[test]
    fn test_rerun_replaces_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let source = FileSource::new(FIXTURE_HTML);

        run(&config, &source).unwrap();
        run(&config, &source).unwrap();

        let conn = Connection::open(&config.db_path).unwrap();
        assert_eq!(db::count_rows(&conn, &config.table_name).unwrap(), 10);
    }

    #[test]
    fn test_missing_rate_aborts_before_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let rates = dir.path().join("rates.csv");
        std::fs::write(&rates, "Currency,Rate\nGBP,0.8\nINR,82.95\n").unwrap();

        let config = RunConfig {
            rate_path: rates,
            ..config_in(dir.path())
        };

        let err = run(&config, &FileSource::new(FIXTURE_HTML)).unwrap_err();
        assert!(matches!(err, EtlError::RateLookup(ref code) if code == "EUR"));

        assert!(!config.csv_out_path.exists());
        assert!(!config.db_path.exists());
        assert_eq!(
            messages(&config.log_path),
            vec![
                "Preliminaries complete. Initiating ETL process",
                "Data extraction complete. Initiating Transformation process",
            ]
        );
    }

    #[test]
    fn test_bad_section_aborts_after_first_event() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            section_id: "By_nothing".to_string(),
            ..config_in(dir.path())
        };

        let err = run(&config, &FileSource::new(FIXTURE_HTML)).unwrap_err();
        assert!(matches!(err, EtlError::Extraction(_)));
        assert_eq!(messages(&config.log_path).len(), 1);
    }
}
