// ⚙️ Run configuration - every path, URL and name a run needs
// Loaded from an optional JSON file; anything missing falls back to defaults.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SOURCE_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Page holding the ranked bank table
    pub source_url: String,

    /// `id` attribute of the heading that precedes the table
    pub section_id: String,

    /// Local HTML snapshot; when set, no HTTP request is made
    pub source_file: Option<PathBuf>,

    /// Exchange rate CSV (`Currency,Rate`)
    pub rate_path: PathBuf,

    pub csv_out_path: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,

    /// Append-only progress log
    pub log_path: PathBuf,

    /// Header labels used to locate the columns we extract
    pub name_column: String,
    pub market_cap_column: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            section_id: "By_market_capitalization".to_string(),
            source_file: None,
            rate_path: PathBuf::from("exchange_rate.csv"),
            csv_out_path: PathBuf::from("largest_banks.csv"),
            db_path: PathBuf::from("Banks.db"),
            table_name: "Largest_banks".to_string(),
            log_path: PathBuf::from("code_log.txt"),
            name_column: "Bank name".to_string(),
            market_cap_column: "Market cap (US$ billion)".to_string(),
        }
    }
}

impl RunConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: RunConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.section_id.trim().is_empty() {
            bail!("section_id must not be empty");
        }
        if self.table_name.trim().is_empty() {
            bail!("table_name must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();

        assert_eq!(config.section_id, "By_market_capitalization");
        assert_eq!(config.table_name, "Largest_banks");
        assert_eq!(config.rate_path, PathBuf::from("exchange_rate.csv"));
        assert!(config.source_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"table_name": "Banks_2023", "db_path": "out/banks.db"}}"#).unwrap();

        let config = RunConfig::from_file(file.path()).unwrap();

        assert_eq!(config.table_name, "Banks_2023");
        assert_eq!(config.db_path, PathBuf::from("out/banks.db"));
        assert_eq!(config.section_id, "By_market_capitalization");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tabel_name": "typo"}}"#).unwrap();

        assert!(RunConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_empty_table_name_rejected() {
        let config = RunConfig {
            table_name: "  ".to_string(),
            ..RunConfig::default()
        };

        assert!(config.validate().is_err());
    }
}
