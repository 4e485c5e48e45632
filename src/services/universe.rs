// src/services/universe.rs
use csv::ReaderBuilder;
use indexmap::IndexMap;
use log::info;
use std::path::Path;

use crate::handlers::error::{PipelineError, Result};
use crate::models::CompanyInfo;

/// Delisted or renamed names kept for their long histories.
pub const HISTORICAL_TICKERS: [&str; 10] = ["GE", "T", "XOM", "WMT", "JPM", "BAC", "C", "PG", "KO", "PEP"];

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
}

/// Constituents from a `Symbol,Name,Sector` CSV, symbols upper-cased.
pub fn read_companies(path: &Path) -> Result<IndexMap<String, CompanyInfo>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let idx_symbol = column(&headers, "Symbol")?;
    let idx_name = column(&headers, "Name")?;
    let idx_sector = column(&headers, "Sector")?;

    let mut companies = IndexMap::new();
    for record in rdr.records() {
        let row = record?;
        let symbol = row.get(idx_symbol).unwrap_or("").trim().to_uppercase();
        if symbol.is_empty() {
            continue;
        }
        companies.insert(
            symbol,
            CompanyInfo {
                name: row.get(idx_name).unwrap_or("").to_string(),
                sector: row.get(idx_sector).unwrap_or("").to_string(),
            },
        );
    }
    info!("Found {} S&P 500 companies", companies.len());
    Ok(companies)
}

/// The stock-stage universe: constituents, the SPY benchmark ETF, and the
/// historical names that are not already listed. Sorted by ticker.
pub fn with_benchmarks(mut companies: IndexMap<String, CompanyInfo>) -> IndexMap<String, CompanyInfo> {
    companies.insert(
        "SPY".to_string(),
        CompanyInfo { name: "S&P 500 ETF".to_string(), sector: "ETF".to_string() },
    );
    for ticker in HISTORICAL_TICKERS {
        companies.entry(ticker.to_string()).or_insert_with(|| CompanyInfo {
            name: ticker.to_string(),
            sector: "Historical".to_string(),
        });
    }
    companies.sort_keys();
    companies
}

/// Raw symbols in file order, for the panel fetch.
pub fn read_symbols(path: &Path) -> Result<Vec<String>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let idx_symbol = column(&headers, "Symbol")?;

    let mut symbols = Vec::new();
    for record in rdr.records() {
        let row = record?;
        let symbol = row.get(idx_symbol).unwrap_or("").trim();
        if !symbol.is_empty() {
            symbols.push(symbol.to_string());
        }
    }
    Ok(symbols)
}
