// 🏗️ Table Extractor - HTML section → ranked BankRows
//
// 1. Find the single element whose id is the section identifier
// 2. Take the first <table> after it in document order
// 3. Resolve columns by header label, then parse body rows in source order

use crate::config::RunConfig;
use crate::error::{EtlError, EtlResult};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// CORE TYPES
// ============================================================================

/// BankRow - one extracted row before currency conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRow {
    /// 1-based position in the source table
    pub rank: u32,
    pub bank_name: String,
    pub market_cap_usd_billion: f64,
}

/// Header labels plus every body row, cells as text
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Column index for a header label, whitespace-collapsed and case-insensitive
    pub fn column_index(&self, label: &str) -> Option<usize> {
        let wanted = collapse_whitespace(label).to_lowercase();
        self.headers
            .iter()
            .position(|h| h.to_lowercase() == wanted)
    }
}

// ============================================================================
// BANK TABLE PARSER
// ============================================================================

#[derive(Debug, Clone)]
pub struct BankTableParser {
    pub section_id: String,
    pub name_column: String,
    pub market_cap_column: String,
}

impl BankTableParser {
    pub fn new(section_id: &str) -> Self {
        let defaults = RunConfig::default();
        BankTableParser {
            section_id: section_id.to_string(),
            name_column: defaults.name_column,
            market_cap_column: defaults.market_cap_column,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        BankTableParser {
            section_id: config.section_id.clone(),
            name_column: config.name_column.clone(),
            market_cap_column: config.market_cap_column.clone(),
        }
    }

    /// Parse the whole document into ranked rows
    pub fn parse(&self, document: &str) -> EtlResult<Vec<BankRow>> {
        let html = Html::parse_document(document);
        let table = find_table_after(&html, &self.section_id)?;
        let raw = read_table(table)?;

        let name_idx = raw.column_index(&self.name_column).ok_or_else(|| {
            EtlError::extraction(format!(
                "column {:?} not found (headers: {:?})",
                self.name_column, raw.headers
            ))
        })?;
        let cap_idx = raw.column_index(&self.market_cap_column).ok_or_else(|| {
            EtlError::extraction(format!(
                "column {:?} not found (headers: {:?})",
                self.market_cap_column, raw.headers
            ))
        })?;

        let mut banks = Vec::with_capacity(raw.rows.len());

        for (i, cells) in raw.rows.iter().enumerate() {
            let rank = (i + 1) as u32;

            let (name_cell, cap_cell) = match (cells.get(name_idx), cells.get(cap_idx)) {
                (Some(name), Some(cap)) => (name, cap),
                _ => {
                    return Err(EtlError::extraction(format!(
                        "row {} has {} cells, expected at least {}",
                        rank,
                        cells.len(),
                        name_idx.max(cap_idx) + 1
                    )))
                }
            };

            let bank_name = collapse_whitespace(name_cell);
            if bank_name.is_empty() {
                return Err(EtlError::extraction(format!("row {} has an empty bank name", rank)));
            }

            let market_cap_usd_billion = parse_market_cap(cap_cell)
                .map_err(|e| EtlError::extraction(format!("row {} ({}): {}", rank, bank_name, e)))?;

            banks.push(BankRow {
                rank,
                bank_name,
                market_cap_usd_billion,
            });
        }

        debug!("Extracted {} rows from section {}", banks.len(), self.section_id);
        Ok(banks)
    }
}

// ============================================================================
// HTML HELPERS
// ============================================================================

/// First <table> after the element carrying `section_id`, in document order
pub fn find_table_after<'a>(html: &'a Html, section_id: &str) -> EtlResult<ElementRef<'a>> {
    let mut matches = html
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().id() == Some(section_id));

    let heading = matches
        .next()
        .ok_or_else(|| EtlError::extraction(format!("heading with id {:?} not found", section_id)))?;

    let duplicates = matches.count();
    if duplicates > 0 {
        return Err(EtlError::extraction(format!(
            "heading id {:?} appears {} times, expected once",
            section_id,
            duplicates + 1
        )));
    }

    let anchor = heading.id();
    html.root_element()
        .descendants()
        .skip_while(|node| node.id() != anchor)
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "table")
        .ok_or_else(|| {
            EtlError::extraction(format!("no table follows heading {:?}", section_id))
        })
}

/// Split a table into its header row and body rows.
///
/// The header is the first row made only of `<th>` cells; every row with at
/// least one `<td>` is a body row.
pub fn read_table(table: ElementRef<'_>) -> EtlResult<RawTable> {
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;
    let data_sel = selector("td")?;

    let mut raw = RawTable::default();

    for row in table.select(&row_sel) {
        let is_body = row.select(&data_sel).next().is_some();

        if is_body {
            raw.rows
                .push(row.select(&cell_sel).map(|c| c.text().collect::<String>()).collect());
        } else if raw.headers.is_empty() {
            // <br> inside a header splits text nodes; join them with a space
            raw.headers = row
                .select(&cell_sel)
                .map(|c| collapse_whitespace(&c.text().collect::<Vec<_>>().join(" ")))
                .collect();
        }
    }

    if raw.headers.is_empty() {
        return Err(EtlError::extraction("table has no header row"));
    }

    Ok(raw)
}

fn selector(css: &str) -> EtlResult<Selector> {
    Selector::parse(css).map_err(|e| EtlError::extraction(format!("bad selector {:?}: {}", css, e)))
}

// ============================================================================
// CELL CLEANING
// ============================================================================

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip newline/whitespace artifacts and parse; must be a finite, non-negative number
pub fn parse_market_cap(raw: &str) -> Result<f64, String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let value: f64 = cleaned
        .parse()
        .map_err(|_| format!("market cap {:?} is not a number", raw.trim()))?;

    if !value.is_finite() || value < 0.0 {
        return Err(format!("market cap {} is out of range", value));
    }

    Ok(value)
}

// ============================================================================
// TESTS
// ============================================================================
