// src/handlers/benchmark.rs
use log::{error, info, warn};
use std::collections::HashMap;

use crate::config::Config;
use crate::handlers::error::Result;
use crate::models::{AnnualReturn, AnnualSheetRow, InstrumentRecord, PricePoint, RollingReturnSet, RollingReturnsRecord};
use crate::services::annual_sheet::read_annual_sheet;
use crate::services::dataset::Dataset;
use crate::services::returns::{
    annual_from_fractions, annual_returns, approximate_quarterly, quarterly_returns, return_values, ReturnPolicy,
};
use crate::services::rolling::rolling_return_set;
use crate::services::stats::summarize_annual;
use crate::services::stooq::{read_annual_income, read_daily_file};

pub const INDEX_KEY: &str = "SPX";
const INDEX_NAME: &str = "S&P 500 Index";
const INDEX_SECTOR: &str = "Market Index";
const BOND_SECTOR: &str = "Fixed Income";

/// Series taken from the annual sheet: (key, display name, column accessor).
const BONDS: [(&str, &str, fn(&AnnualSheetRow) -> Option<f64>); 3] = [
    ("TBILL", "3-Month Treasury Bill", |r: &AnnualSheetRow| r.tbill),
    ("TBOND10", "10-Year Treasury Bond", |r: &AnnualSheetRow| r.tbond10),
    ("BAACORP", "Baa Corporate Bond", |r: &AnnualSheetRow| r.baa_corporate),
];

/// Record for a source that only publishes annual returns: quarters are
/// approximated and `dataPoints` counts annual observations.
pub fn annual_only_record(name: &str, sector: &str, annual: Vec<AnnualReturn>) -> Option<InstrumentRecord> {
    let start_year = annual.first()?.year.clone();
    let end_year = annual.last()?.year.clone();

    Some(InstrumentRecord {
        name: name.to_string(),
        sector: sector.to_string(),
        quarterly_returns: approximate_quarterly(&annual),
        stats: summarize_annual(&annual),
        data_points: annual.len(),
        annual_returns: annual,
        start_year,
        end_year,
        annual_returns_total: None,
    })
}

fn sheet_series(rows: &[AnnualSheetRow], column: fn(&AnnualSheetRow) -> Option<f64>) -> Vec<AnnualReturn> {
    annual_from_fractions(rows.iter().filter_map(|r| Some((r.year, column(r)?))))
}

pub fn index_annual_from_sheet(rows: &[AnnualSheetRow]) -> Vec<AnnualReturn> {
    sheet_series(rows, |r| r.sp_return)
}

/// The index and bond records derived from the annual sheet.
pub fn sheet_records(rows: &[AnnualSheetRow]) -> Vec<(&'static str, InstrumentRecord)> {
    let mut records = Vec::new();

    if let Some(record) = annual_only_record(INDEX_NAME, INDEX_SECTOR, index_annual_from_sheet(rows)) {
        records.push((INDEX_KEY, record));
    }

    for (key, name, column) in BONDS {
        let annual = sheet_series(rows, column);
        if let Some(record) = annual_only_record(name, BOND_SECTOR, annual) {
            records.push((key, record));
        }
    }
    records
}

/// The index recomputed from daily closes: price-only annual returns, true
/// quarterly returns, and the total-return variant alongside. The total
/// return comes from `income` when given, otherwise from `sheet_total`.
pub fn refined_index_record(
    closes: &[PricePoint],
    income: Option<&HashMap<String, f64>>,
    sheet_total: Option<&[AnnualReturn]>,
) -> Option<InstrumentRecord> {
    let annual = annual_returns(closes, ReturnPolicy::PriceOnly);
    let start_year = annual.first()?.year.clone();
    let end_year = annual.last()?.year.clone();

    let total = match (income, sheet_total) {
        (Some(income), _) => Some(annual_returns(closes, ReturnPolicy::TotalReturn(income))),
        (None, Some(sheet)) if !sheet.is_empty() => Some(sheet.to_vec()),
        _ => None,
    };

    Some(InstrumentRecord {
        name: INDEX_NAME.to_string(),
        sector: INDEX_SECTOR.to_string(),
        quarterly_returns: quarterly_returns(closes, ReturnPolicy::PriceOnly),
        stats: summarize_annual(&annual),
        data_points: closes.len(),
        annual_returns: annual,
        start_year,
        end_year,
        annual_returns_total: total,
    })
}

/// The reserved rolling-returns entry. Total return is the primary variant;
/// price-only stands in when no total-return series exists.
pub fn rolling_record(
    total: Option<&[AnnualReturn]>,
    price_only: Option<&[AnnualReturn]>,
    windows: &[u32],
) -> Option<RollingReturnsRecord> {
    let total = total.filter(|t| !t.is_empty());
    let price_only = price_only.filter(|p| !p.is_empty());
    let primary = total.or(price_only)?;

    let set_for = |series: Option<&[AnnualReturn]>| {
        series
            .map(|s| rolling_return_set(&return_values(s), windows))
            .unwrap_or_default()
    };

    info!("Calculating rolling returns for S&P 500...");
    let periods_total = set_for(total);
    let periods_price_only = set_for(price_only);
    let periods: RollingReturnSet = if total.is_some() {
        periods_total.clone()
    } else {
        periods_price_only.clone()
    };

    Some(RollingReturnsRecord {
        name: "S&P 500 Rolling Returns".to_string(),
        description: "Pre-calculated rolling returns for S&P 500".to_string(),
        periods,
        periods_total,
        periods_price_only,
        start_year: primary[0].year.clone(),
        end_year: primary[primary.len() - 1].year.clone(),
    })
}

#[derive(Debug, Default)]
pub struct BenchmarkReport {
    pub added: Vec<String>,
    pub unavailable: Vec<String>,
}

fn load_income(config: &Config) -> Option<HashMap<String, f64>> {
    let path = config.index_dividends_csv.as_ref()?;
    match read_annual_income(path) {
        Ok(income) => Some(income),
        Err(e) => {
            error!("Failed to read index dividends from {}: {}", path.display(), e);
            None
        }
    }
}

fn load_closes(config: &Config) -> Option<Vec<PricePoint>> {
    let path = config.index_closes_path.as_ref()?;
    match read_daily_file(path) {
        Ok(closes) if !closes.is_empty() => Some(closes),
        Ok(_) => {
            warn!("No index closes in {}", path.display());
            None
        }
        Err(e) => {
            error!("Failed to read index closes from {}: {}", path.display(), e);
            None
        }
    }
}

/// Add the index, bonds and rolling returns to `dataset`. Unavailable sources
/// are logged and left out; only a reserved-key clash is an error.
pub fn compose_benchmarks(dataset: &mut Dataset, config: &Config) -> Result<BenchmarkReport> {
    let mut report = BenchmarkReport::default();

    let rows = match read_annual_sheet(&config.sp_returns_csv) {
        Ok(rows) => rows,
        Err(e) => {
            error!("Annual returns sheet {} unavailable: {}", config.sp_returns_csv.display(), e);
            report.unavailable.push(config.sp_returns_csv.display().to_string());
            Vec::new()
        }
    };

    for (key, record) in sheet_records(&rows) {
        info!(
            "✓ Added {}: {} years, {} quarters",
            record.name,
            record.annual_returns.len(),
            record.quarterly_returns.len()
        );
        dataset.insert_instrument(key, record)?;
        report.added.push(key.to_string());
    }

    let sheet_total = index_annual_from_sheet(&rows);
    let mut total = (!sheet_total.is_empty()).then(|| sheet_total.clone());
    let mut price_only = None;

    if let Some(closes) = load_closes(config) {
        let income = load_income(config);
        if let Some(record) = refined_index_record(&closes, income.as_ref(), Some(sheet_total.as_slice())) {
            info!(
                "✓ Recomputed S&P 500 Index from {} daily closes ({}-{})",
                closes.len(),
                record.start_year,
                record.end_year
            );
            price_only = Some(record.annual_returns.clone());
            if let Some(variant) = &record.annual_returns_total {
                total = Some(variant.clone());
            }
            dataset.insert_instrument(INDEX_KEY, record)?;
            if !report.added.iter().any(|k| k == INDEX_KEY) {
                report.added.push(INDEX_KEY.to_string());
            }
        }
    } else if config.index_closes_path.is_some() {
        report.unavailable.push(INDEX_KEY.to_string());
    }

    match rolling_record(total.as_deref(), price_only.as_deref(), &config.rolling_windows) {
        Some(record) => {
            info!("Rolling returns: {} total data points", record.periods.total_points());
            dataset.insert_rolling(record);
        }
        None => warn!("No index history available; rolling returns omitted"),
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sheet() -> Vec<AnnualSheetRow> {
        [(2019, 0.1, 0.02, 0.03, 0.05), (2020, 0.1, 0.01, 0.04, 0.06), (2021, -0.1, 0.0, -0.02, 0.01)]
            .iter()
            .map(|&(year, sp, tb, bond, baa)| AnnualSheetRow {
                year,
                sp_return: Some(sp),
                tbill: Some(tb),
                tbond10: Some(bond),
                baa_corporate: Some(baa),
            })
            .collect()
    }

    fn closes() -> Vec<PricePoint> {
        [(2019, 100.0), (2020, 110.0), (2021, 99.0)]
            .iter()
            .map(|&(y, c)| PricePoint::new(NaiveDate::from_ymd_opt(y, 12, 31).unwrap(), c))
            .collect()
    }

    #[test]
    fn sheet_yields_index_and_bonds() {
        let records = sheet_records(&sheet());
        let keys: Vec<&str> = records.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["SPX", "TBILL", "TBOND10", "BAACORP"]);

        let (_, spx) = &records[0];
        assert_eq!(spx.sector, "Market Index");
        assert_eq!(spx.data_points, 3);
        assert_eq!(spx.start_year, "2019");
        // first year is not expanded into quarters
        assert_eq!(spx.quarterly_returns.len(), 8);
        assert_eq!(spx.quarterly_returns[0].quarter, "2020Q1");
        assert_eq!(spx.quarterly_returns[0].return_pct, 2.5);
        assert_eq!(spx.stats.as_ref().unwrap().count, 3);

        let (_, tbill) = &records[1];
        assert_eq!(tbill.name, "3-Month Treasury Bill");
        assert_eq!(tbill.sector, "Fixed Income");
        assert_eq!(tbill.annual_returns[0].return_pct, 2.0);
    }

    #[test]
    fn blank_bond_cell_keeps_index_year() {
        let mut rows = sheet();
        rows[2].baa_corporate = None;
        rows[2].tbond10 = None;

        let records = sheet_records(&rows);
        let (_, spx) = &records[0];
        let years: Vec<&str> = spx.annual_returns.iter().map(|r| r.year.as_str()).collect();
        assert_eq!(years, vec!["2019", "2020", "2021"]);
        assert_eq!(spx.end_year, "2021");

        let (_, baa) = records.iter().find(|(k, _)| *k == "BAACORP").unwrap();
        assert_eq!(baa.data_points, 2);
        assert_eq!(baa.end_year, "2020");
    }

    #[test]
    fn refined_index_carries_both_variants() {
        let income = HashMap::from([("2020".to_string(), 2.0)]);
        let record = refined_index_record(&closes(), Some(&income), None).unwrap();
        assert_eq!(record.annual_returns[0].return_pct, 10.0);
        assert_eq!(record.annual_returns[1].return_pct, -10.0);
        let total = record.annual_returns_total.unwrap();
        assert_eq!(total[0].return_pct, 12.0);
        assert_eq!(total[1].return_pct, -10.0);
        assert_eq!(record.data_points, 3);
    }

    #[test]
    fn refined_index_falls_back_to_sheet_total() {
        let sheet_total = index_annual_from_sheet(&sheet());
        let record = refined_index_record(&closes(), None, Some(sheet_total.as_slice())).unwrap();
        assert_eq!(record.annual_returns_total, Some(sheet_total));
        assert!(refined_index_record(&closes()[..1], None, None).is_none());
    }

    #[test]
    fn rolling_prefers_total_return() {
        let total = index_annual_from_sheet(&sheet());
        let price = annual_returns(&closes(), ReturnPolicy::PriceOnly);

        let record = rolling_record(Some(total.as_slice()), Some(price.as_slice()), &[1, 2, 5]).unwrap();
        assert_eq!(record.periods, record.periods_total);
        assert_eq!(record.periods_total.get(1).unwrap(), &[10.0, 10.0, -10.0]);
        assert_eq!(record.periods_price_only.get(2).unwrap(), &[-0.5]);
        assert!(record.periods_total.get(5).unwrap().is_empty());
        assert_eq!(record.start_year, "2019");

        let fallback = rolling_record(None, Some(price.as_slice()), &[1]).unwrap();
        assert_eq!(fallback.periods, fallback.periods_price_only);
        assert!(fallback.periods_total.is_empty());
        assert!(rolling_record(None, None, &[1]).is_none());
    }

    #[test]
    fn missing_sheet_leaves_stocks_untouched() {
        let config = Config {
            sp_returns_csv: "/nonexistent/spreturns.csv".into(),
            ..Config::default()
        };
        let mut dataset = Dataset::new();
        let report = compose_benchmarks(&mut dataset, &config).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(report.unavailable.len(), 1);
    }
}
