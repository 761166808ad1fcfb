// 💱 Currency Transformer - USD market cap → GBP / EUR / INR
//
// RateTable is loaded once per run and never mutated. Lookups are by exact
// currency code; only the output column order is fixed.

use crate::db::EnrichedBankRow;
use crate::error::{EtlError, EtlResult};
use crate::parser::BankRow;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

// ============================================================================
// TARGET CURRENCIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetCurrency {
    Gbp,
    Eur,
    Inr,
}

impl TargetCurrency {
    /// Output column order
    pub const ALL: [TargetCurrency; 3] = [TargetCurrency::Gbp, TargetCurrency::Eur, TargetCurrency::Inr];

    pub fn code(&self) -> &'static str {
        match self {
            TargetCurrency::Gbp => "GBP",
            TargetCurrency::Eur => "EUR",
            TargetCurrency::Inr => "INR",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            TargetCurrency::Gbp => "marketCapGBPBillion",
            TargetCurrency::Eur => "marketCapEURBillion",
            TargetCurrency::Inr => "marketCapINRBillion",
        }
    }
}

// ============================================================================
// RATE TABLE
// ============================================================================

#[derive(Debug, Deserialize)]
struct RateRecord {
    #[serde(rename = "Currency")]
    currency: String,

    #[serde(rename = "Rate")]
    rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Load a `Currency,Rate` CSV
    pub fn from_csv<P: AsRef<Path>>(path: P) -> EtlResult<Self> {
        let origin = format!("{:?}", path.as_ref());
        let invalid = |reason: String| EtlError::RateTable {
            origin: origin.clone(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())
            .map_err(|e| invalid(e.to_string()))?;

        let mut pairs = Vec::new();
        for (line_num, result) in reader.deserialize::<RateRecord>().enumerate() {
            // +2: 1-indexed plus the header row
            let record = result.map_err(|e| invalid(format!("line {}: {}", line_num + 2, e)))?;
            pairs.push((record.currency, record.rate));
        }

        Self::build(&origin, pairs)
    }

    pub fn from_pairs<I, S>(pairs: I) -> EtlResult<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::build(
            "<in-memory>",
            pairs.into_iter().map(|(code, rate)| (code.into(), rate)),
        )
    }

    fn build(origin: &str, pairs: impl IntoIterator<Item = (String, f64)>) -> EtlResult<Self> {
        let mut rates = HashMap::new();

        for (code, rate) in pairs {
            if code.is_empty() {
                return Err(EtlError::RateTable {
                    origin: origin.to_string(),
                    reason: "empty currency code".to_string(),
                });
            }
            if !rate.is_finite() || rate <= 0.0 {
                return Err(EtlError::RateTable {
                    origin: origin.to_string(),
                    reason: format!("rate for {} must be positive, got {}", code, rate),
                });
            }
            if rates.insert(code.clone(), rate).is_some() {
                return Err(EtlError::RateTable {
                    origin: origin.to_string(),
                    reason: format!("duplicate currency {}", code),
                });
            }
        }

        debug!("Loaded {} exchange rates from {}", rates.len(), origin);
        Ok(RateTable { rates })
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Rate for `code`, or RateLookup if absent. There is no fallback rate.
    pub fn require(&self, code: &str) -> EtlResult<f64> {
        self.get(code)
            .ok_or_else(|| EtlError::RateLookup(code.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

// ============================================================================
// TRANSFORM
// ============================================================================

/// Round half away from zero to 2 decimals (half-up for non-negative values)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Derive GBP/EUR/INR columns for every row.
///
/// All three rates are resolved before any row is touched, so a missing
/// currency yields an error and no output at all.
pub fn convert(rows: &[BankRow], rates: &RateTable) -> EtlResult<Vec<EnrichedBankRow>> {
    let gbp = rates.require(TargetCurrency::Gbp.code())?;
    let eur = rates.require(TargetCurrency::Eur.code())?;
    let inr = rates.require(TargetCurrency::Inr.code())?;

    Ok(rows
        .iter()
        .map(|row| EnrichedBankRow {
            rank: row.rank,
            bank_name: row.bank_name.clone(),
            market_cap_usd_billion: row.market_cap_usd_billion,
            market_cap_gbp_billion: round2(row.market_cap_usd_billion * gbp),
            market_cap_eur_billion: round2(row.market_cap_usd_billion * eur),
            market_cap_inr_billion: round2(row.market_cap_usd_billion * inr),
        })
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_rates() -> RateTable {
        RateTable::from_pairs([("GBP", 0.8), ("EUR", 0.93), ("INR", 82.95)]).unwrap()
    }

    fn bank(rank: u32, name: &str, usd: f64) -> BankRow {
        BankRow {
            rank,
            bank_name: name.to_string(),
            market_cap_usd_billion: usd,
        }
    }

    #[test]
    fn test_reference_conversion() {
        let rows = convert(&[bank(1, "Test Bank", 100.0)], &reference_rates()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].market_cap_gbp_billion, 80.0);
        assert_eq!(rows[0].market_cap_eur_billion, 93.0);
        assert_eq!(rows[0].market_cap_inr_billion, 8295.0);
    }

    #[test]
    fn test_conversion_rounds_to_two_places() {
        let rows = convert(&[bank(5, "HSBC Holdings PLC", 157.91)], &reference_rates()).unwrap();

        // 157.91 * 0.93 = 146.8563
        assert_eq!(rows[0].market_cap_eur_billion, 146.86);
        // 157.91 * 0.8 = 126.328
        assert_eq!(rows[0].market_cap_gbp_billion, 126.33);
        assert_eq!(rows[0].rank, 5);
        assert_eq!(rows[0].market_cap_usd_billion, 157.91);
    }

    #[test]
    fn test_round2_half_up() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(2.5), 2.5);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(1.004), 1.0);
    }

    #[test]
    fn test_missing_eur_is_fatal_with_no_rows() {
        let rates = RateTable::from_pairs([("GBP", 0.8), ("INR", 82.95)]).unwrap();
        let result = convert(&[bank(1, "A", 1.0), bank(2, "B", 2.0)], &rates);

        match result {
            Err(EtlError::RateLookup(code)) => assert_eq!(code, "EUR"),
            other => panic!("expected RateLookup, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let rates = RateTable::from_pairs([("gbp", 0.8), ("EUR", 0.93), ("INR", 82.95)]).unwrap();
        assert!(matches!(convert(&[], &rates), Err(EtlError::RateLookup(_))));
    }

    #[test]
    fn test_extra_currencies_ignored() {
        let rates =
            RateTable::from_pairs([("JPY", 147.2), ("GBP", 0.8), ("EUR", 0.93), ("INR", 82.95)])
                .unwrap();
        let rows = convert(&[bank(1, "A", 10.0)], &rates).unwrap();

        assert_eq!(rows[0].market_cap_gbp_billion, 8.0);
        assert_eq!(rates.len(), 4);
    }

    #[test]
    fn test_invalid_rates_rejected() {
        assert!(RateTable::from_pairs([("EUR", 0.0)]).is_err());
        assert!(RateTable::from_pairs([("EUR", -1.0)]).is_err());
        assert!(RateTable::from_pairs([("EUR", 0.9), ("EUR", 0.93)]).is_err());
    }

    #[test]
    fn test_from_csv_fixture() {
        let rates = RateTable::from_csv("tests/fixtures/exchange_rate.csv").unwrap();

        assert_eq!(rates.get("EUR"), Some(0.93));
        assert_eq!(rates.get("GBP"), Some(0.8));
        assert_eq!(rates.get("INR"), Some(82.95));
        assert_eq!(rates.get("USD"), None);
    }

    #[test]
    fn test_from_csv_bad_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.csv");
        std::fs::write(&path, "Currency,Rate\nEUR,abc\n").unwrap();

        let err = RateTable::from_csv(&path).unwrap_err();
        assert!(matches!(err, EtlError::RateTable { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_from_csv_missing_file() {
        assert!(RateTable::from_csv("/nonexistent/rates.csv").is_err());
    }

    #[test]
    fn test_column_order() {
        let columns: Vec<&str> = TargetCurrency::ALL.iter().map(|c| c.column()).collect();
        assert_eq!(
            columns,
            vec!["marketCapGBPBillion", "marketCapEURBillion", "marketCapINRBillion"]
        );
    }
}
