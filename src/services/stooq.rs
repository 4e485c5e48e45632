// src/services/stooq.rs
use chrono::NaiveDate;
use csv::{Reader, ReaderBuilder};
use log::{debug, info};
use regex::Regex;
use reqwest::Client;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::handlers::error::{PipelineError, Result};
use crate::models::PricePoint;

const EXCHANGE_DIRS: [&str; 6] = [
    "nasdaq stocks",
    "nyse stocks",
    "nysemkt stocks",
    "nasdaq etfs",
    "nyse etfs",
    "nysemkt etfs",
];

/// Locate `<exchange dir>/*/<ticker>.us.txt` under the bulk download root.
/// The first match in exchange order wins.
pub fn find_stock_file(data_dir: &Path, ticker: &str) -> Option<PathBuf> {
    let file_name = format!("{}.us.txt", ticker.to_lowercase());

    for exchange in EXCHANGE_DIRS {
        let Ok(entries) = fs::read_dir(data_dir.join(exchange)) else {
            continue;
        };
        let mut buckets: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        buckets.sort();

        if let Some(found) = buckets.into_iter().map(|b| b.join(&file_name)).find(|p| p.is_file()) {
            return Some(found);
        }
    }
    None
}

/// Parse the bulk ASCII format:
/// `<TICKER>,<PER>,<DATE>,<TIME>,<OPEN>,<HIGH>,<LOW>,<CLOSE>,<VOL>,<OPENINT>`.
/// Short or unparsable rows are dropped; the result is sorted by date.
pub fn parse_daily_file(contents: &str) -> Vec<PricePoint> {
    let mut prices: Vec<PricePoint> = contents
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.trim().split(',').collect();
            if parts.len() < 8 {
                return None;
            }
            let date = NaiveDate::parse_from_str(parts[2], "%Y%m%d").ok()?;
            let close = parts[7].trim().parse::<f64>().ok()?;
            Some(PricePoint::new(date, close))
        })
        .collect();
    prices.sort_by_key(|p| p.date);
    prices
}

pub fn read_daily_file(path: &Path) -> Result<Vec<PricePoint>> {
    let contents = fs::read_to_string(path)?;
    let prices = parse_daily_file(&contents);
    debug!("Read {} prices from {}", prices.len(), path.display());
    Ok(prices)
}

/// Maps tickers to the quote provider's symbols. Build once per batch.
pub struct SymbolMapper {
    valid: Regex,
}

impl SymbolMapper {
    pub fn new() -> Result<Self> {
        Ok(SymbolMapper {
            valid: Regex::new(r"^\^?[A-Za-z0-9][A-Za-z0-9.\-]*$")?,
        })
    }

    /// `BRK.B` -> `brk-b.us`; index symbols such as `^SPX` keep their caret.
    pub fn to_stooq(&self, ticker: &str) -> Result<String> {
        let t = ticker.trim().replace('.', "-");
        if !self.valid.is_match(&t) {
            return Err(PipelineError::InvalidSymbol(ticker.to_string()));
        }
        if t.starts_with('^') {
            return Ok(t.to_lowercase());
        }
        Ok(format!("{}.us", t).to_lowercase())
    }
}

pub fn daily_csv_url(stooq_symbol: &str) -> String {
    format!("https://stooq.com/q/d/l/?s={}&i=d", stooq_symbol)
}

/// Parse the provider's CSV download (`Date,Open,High,Low,Close,Volume`).
/// Missing `Date`/`Close` columns yield an empty series rather than an error;
/// unparsable closes are dropped.
pub fn parse_daily_csv(csv_text: &str) -> Result<Vec<PricePoint>> {
    let mut rdr = Reader::from_reader(csv_text.as_bytes());

    let headers = rdr.headers()?.clone();
    let idx_date = headers.iter().position(|h| h.trim() == "Date");
    let idx_close = headers.iter().position(|h| h.trim() == "Close");
    let (Some(idx_date), Some(idx_close)) = (idx_date, idx_close) else {
        return Ok(Vec::new());
    };

    let mut prices = Vec::new();
    for record in rdr.records() {
        let Ok(row) = record else { continue };
        let date = row.get(idx_date).and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());
        let close = row.get(idx_close).and_then(|c| c.trim().parse::<f64>().ok());
        if let (Some(date), Some(close)) = (date, close) {
            prices.push(PricePoint::new(date, close));
        }
    }
    prices.sort_by_key(|p| p.date);
    Ok(prices)
}

/// Fetch one symbol's full daily close history.
pub async fn fetch_daily_close(client: &Client, stooq_symbol: &str) -> Result<Vec<PricePoint>> {
    let url = daily_csv_url(stooq_symbol);
    info!("Fetching daily closes from URL: {}", url);

    let csv_text = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    parse_daily_csv(&csv_text)
}

/// Annual dividends per index unit, `year,dividend`, keyed by year label.
pub fn read_annual_income(path: &Path) -> Result<HashMap<String, f64>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let idx_year = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("year"))
        .ok_or_else(|| PipelineError::MissingColumn("year".to_string()))?;
    let idx_income = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("dividend"))
        .ok_or_else(|| PipelineError::MissingColumn("dividend".to_string()))?;

    let mut income = HashMap::new();
    for record in rdr.records() {
        let row = record?;
        let year = row.get(idx_year).unwrap_or("");
        if let Some(amount) = row.get(idx_income).and_then(|v| v.parse::<f64>().ok()) {
            income.insert(year.to_string(), amount);
        }
    }
    Ok(income)
}
