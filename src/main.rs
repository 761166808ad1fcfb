use anyhow::Result;
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

use largest_banks_etl::{run, DocumentSource, FileSource, HttpSource, RunConfig};

fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries the report
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    // Optional first argument: JSON config file
    let config = match args.get(1) {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };

    let source: Box<dyn DocumentSource> = match &config.source_file {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(HttpSource::new()?),
    };

    let summary = run(&config, source.as_ref())?;

    tracing::info!(
        "Done: {} banks written to {:?} and table {} in {:?}",
        summary.loaded,
        config.csv_out_path,
        config.table_name,
        config.db_path
    );

    Ok(())
}
