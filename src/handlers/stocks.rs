// src/handlers/stocks.rs
use indexmap::IndexMap;
use log::{error, info, warn};
use std::fmt;
use std::path::Path;

use crate::config::Config;
use crate::models::{CompanyInfo, InstrumentRecord, PricePoint};
use crate::services::dataset::Dataset;
use crate::services::returns::{annual_returns, quarterly_returns, ReturnPolicy};
use crate::services::stats::summarize_annual;
use crate::services::stooq::{find_stock_file, read_daily_file};

#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub min_trading_days: usize,
    pub min_annual_returns: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds::from(&Config::default())
    }
}

impl From<&Config> for Thresholds {
    fn from(config: &Config) -> Self {
        Thresholds {
            min_trading_days: config.min_trading_days,
            min_annual_returns: config.min_annual_returns,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    SourceUnavailable,
    SourceUnreadable(String),
    InsufficientPrices { days: usize },
    InsufficientHistory { years: usize },
    /// The ticker collides with the reserved rolling-returns key.
    ReservedKey,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkipReason::SourceUnavailable => write!(f, "File not found"),
            SkipReason::SourceUnreadable(e) => write!(f, "Error - {}", e),
            SkipReason::InsufficientPrices { days } => write!(f, "Insufficient data ({} days)", days),
            SkipReason::InsufficientHistory { years } => write!(f, "Insufficient annual data ({} years)", years),
            SkipReason::ReservedKey => write!(f, "Ticker uses a reserved key"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentOutcome {
    Processed(InstrumentRecord),
    Skipped(SkipReason),
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl BatchReport {
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn log_summary(&self, dataset: &Dataset) {
        info!("✓ Processed {} stocks", self.processed_count());
        info!("✗ Skipped {} stocks", self.skipped_count());

        let records: Vec<&InstrumentRecord> = dataset.instruments().map(|(_, r)| r).collect();
        if !records.is_empty() {
            let total: usize = records.iter().map(|r| r.annual_returns.len()).sum();
            info!("Average years of data per stock: {:.1}", total as f64 / records.len() as f64);
        }
    }
}

/// Turn one stock's daily closes into a record, or the reason it is left out.
pub fn evaluate(info: &CompanyInfo, prices: &[PricePoint], thresholds: Thresholds) -> InstrumentOutcome {
    if prices.len() < thresholds.min_trading_days {
        return InstrumentOutcome::Skipped(SkipReason::InsufficientPrices { days: prices.len() });
    }

    let annual = annual_returns(prices, ReturnPolicy::PriceOnly);
    let quarterly = quarterly_returns(prices, ReturnPolicy::PriceOnly);

    if annual.len() < thresholds.min_annual_returns || annual.is_empty() {
        return InstrumentOutcome::Skipped(SkipReason::InsufficientHistory { years: annual.len() });
    }

    let start_year = annual[0].year.clone();
    let end_year = annual[annual.len() - 1].year.clone();

    InstrumentOutcome::Processed(InstrumentRecord {
        name: info.name.clone(),
        sector: info.sector.clone(),
        stats: summarize_annual(&annual),
        annual_returns: annual,
        quarterly_returns: quarterly,
        data_points: prices.len(),
        start_year,
        end_year,
        annual_returns_total: None,
    })
}

pub fn process_stock(data_dir: &Path, ticker: &str, info: &CompanyInfo, thresholds: Thresholds) -> InstrumentOutcome {
    let Some(path) = find_stock_file(data_dir, ticker) else {
        return InstrumentOutcome::Skipped(SkipReason::SourceUnavailable);
    };
    match read_daily_file(&path) {
        Ok(prices) => evaluate(info, &prices, thresholds),
        Err(e) => InstrumentOutcome::Skipped(SkipReason::SourceUnreadable(e.to_string())),
    }
}

/// Run every universe member through `load`. Per-ticker
/// failures become skips; the batch always completes.
pub fn process_with<F>(universe: &IndexMap<String, CompanyInfo>, mut load: F) -> (Dataset, BatchReport)
where
    F: FnMut(&str, &CompanyInfo) -> InstrumentOutcome,
{
    let mut dataset = Dataset::new();
    let mut report = BatchReport::default();

    for (ticker, info) in universe {
        match load(ticker.as_str(), info) {
            InstrumentOutcome::Processed(record) => {
                info!(
                    "  ✓ {}: {} years, {} quarters ({}-{})",
                    ticker,
                    record.annual_returns.len(),
                    record.quarterly_returns.len(),
                    record.start_year,
                    record.end_year
                );
                if let Err(e) = dataset.insert_instrument(ticker.as_str(), record) {
                    error!("  ✗ {}: {}", ticker, e);
                    report.skipped.push((ticker.clone(), SkipReason::ReservedKey));
                    continue;
                }
                report.processed.push(ticker.clone());
            }
            InstrumentOutcome::Skipped(reason) => {
                warn!("  ✗ {}: {}", ticker, reason);
                report.skipped.push((ticker.clone(), reason));
            }
        }
    }
    (dataset, report)
}

pub fn process_universe(
    data_dir: &Path,
    universe: &IndexMap<String, CompanyInfo>,
    thresholds: Thresholds,
) -> (Dataset, BatchReport) {
    process_with(universe, |ticker, info| process_stock(data_dir, ticker, info, thresholds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dataset::ROLLING_RETURNS_KEY;
    use chrono::{Datelike, Duration, NaiveDate};

    fn info() -> CompanyInfo {
        CompanyInfo { name: "Test Co".into(), sector: "Industrials".into() }
    }

    // One close per calendar day, rising 10% per year-end.
    fn daily_prices(start_year: i32, days: i64) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(start_year, 1, 1).unwrap();
        (0..days)
            .map(|i| {
                let date = start + Duration::days(i);
                let years = date.year() - start_year;
                PricePoint::new(date, 100.0 * 1.1f64.powi(years))
            })
            .collect()
    }

    #[test]
    fn record_is_built_from_daily_closes() {
        let prices = daily_prices(2018, 365 * 3 + 1);
        let InstrumentOutcome::Processed(record) = evaluate(&info(), &prices, Thresholds::default()) else {
            panic!("expected a record");
        };
        assert_eq!(record.start_year, "2019");
        assert_eq!(record.end_year, "2020");
        assert_eq!(record.data_points, prices.len());
        assert!(record.annual_returns.iter().all(|r| r.return_pct == 10.0));
        assert_eq!(record.stats.as_ref().unwrap().count, record.annual_returns.len());
        assert_eq!(record.quarterly_returns.first().unwrap().quarter, "2018Q2");
    }

    #[test]
    fn short_series_are_skipped() {
        let prices = daily_prices(2020, 100);
        assert_eq!(
            evaluate(&info(), &prices, Thresholds::default()),
            InstrumentOutcome::Skipped(SkipReason::InsufficientPrices { days: 100 })
        );

        // a full year of closes still only yields one annual return
        let prices = daily_prices(2020, 400);
        assert_eq!(
            evaluate(&info(), &prices, Thresholds::default()),
            InstrumentOutcome::Skipped(SkipReason::InsufficientHistory { years: 1 })
        );
    }

    #[test]
    fn batch_reports_processed_and_skipped() {
        let mut universe = IndexMap::new();
        universe.insert("AAA".to_string(), info());
        universe.insert("BBB".to_string(), info());
        universe.insert("CCC".to_string(), info());

        let (dataset, report) = process_with(&universe, |ticker, info| match ticker {
            "AAA" => evaluate(info, &daily_prices(2015, 365 * 4), Thresholds::default()),
            "BBB" => InstrumentOutcome::Skipped(SkipReason::SourceUnavailable),
            _ => evaluate(info, &daily_prices(2015, 10), Thresholds::default()),
        });

        assert_eq!(report.processed, vec!["AAA".to_string()]);
        assert_eq!(report.skipped_count(), 2);
        assert_eq!(report.skipped[0], ("BBB".to_string(), SkipReason::SourceUnavailable));
        assert_eq!(dataset.keys().collect::<Vec<_>>(), vec!["AAA"]);
    }

    #[test]
    fn reserved_ticker_is_skipped_as_reserved() {
        let mut universe = IndexMap::new();
        universe.insert(ROLLING_RETURNS_KEY.to_string(), info());
        universe.insert("AAA".to_string(), info());

        let (dataset, report) = process_with(&universe, |_, info| {
            evaluate(info, &daily_prices(2015, 365 * 4), Thresholds::default())
        });

        assert_eq!(report.skipped, vec![(ROLLING_RETURNS_KEY.to_string(), SkipReason::ReservedKey)]);
        assert_eq!(report.processed, vec!["AAA".to_string()]);
        assert!(dataset.get(ROLLING_RETURNS_KEY).is_none());
        assert!(dataset.rolling().is_none());
    }

    #[test]
    fn missing_files_are_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            process_stock(dir.path(), "ZZZ", &info(), Thresholds::default()),
            InstrumentOutcome::Skipped(SkipReason::SourceUnavailable)
        );
    }
}
