// src/services/returns.rs
use std::collections::{BTreeMap, HashMap};
use log::debug;

use crate::models::{AnnualReturn, PricePoint, QuarterlyReturn};

/// How a period's return is defined.
#[derive(Debug, Clone, Copy)]
pub enum ReturnPolicy<'a> {
    PriceOnly,
    /// Income (dividends, coupons) keyed by the period label it is paid in,
    /// e.g. "2021" for annual or "2021Q3" for quarterly returns.
    TotalReturn(&'a HashMap<String, f64>),
}

impl ReturnPolicy<'_> {
    fn income_for(&self, period: &str) -> f64 {
        match self {
            ReturnPolicy::PriceOnly => 0.0,
            ReturnPolicy::TotalReturn(income) => income.get(period).copied().unwrap_or(0.0),
        }
    }
}

/// Round to two decimals on the exact binary value, so 2.675 becomes 2.67
/// as it always has in the published dataset. Values that are exact binary
/// ties (0.125) go to the even digit.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.2}", value).parse::<f64>().unwrap_or(value)
}

// Last close of each period label, labels in ascending order.
fn representative_closes<F>(prices: &[PricePoint], label: F) -> BTreeMap<String, f64>
where
    F: Fn(&PricePoint) -> String,
{
    let mut closes = BTreeMap::new();
    for point in prices {
        closes.insert(label(point), point.close);
    }
    closes
}

fn period_returns<F>(prices: &[PricePoint], label: F, policy: ReturnPolicy) -> Vec<(String, f64)>
where
    F: Fn(&PricePoint) -> String,
{
    let closes = representative_closes(prices, label);
    let periods: Vec<(&String, &f64)> = closes.iter().collect();

    periods
        .windows(2)
        .filter_map(|pair| {
            let (_, &prev) = pair[0];
            let (period, &curr) = pair[1];
            if prev <= 0.0 {
                debug!("Skipping {}: non-positive prior close {}", period, prev);
                return None;
            }
            let income = policy.income_for(period);
            let pct = ((curr - prev + income) / prev) * 100.0;
            Some((period.clone(), round2(pct)))
        })
        .collect()
}

/// Year-over-year returns from each calendar year's last close.
/// The first year has no predecessor and yields nothing.
pub fn annual_returns(prices: &[PricePoint], policy: ReturnPolicy) -> Vec<AnnualReturn> {
    period_returns(prices, PricePoint::year_label, policy)
        .into_iter()
        .map(|(year, return_pct)| AnnualReturn { year, return_pct })
        .collect()
}

/// Quarter-over-quarter returns (not annualized) from each quarter's last close.
pub fn quarterly_returns(prices: &[PricePoint], policy: ReturnPolicy) -> Vec<QuarterlyReturn> {
    period_returns(prices, PricePoint::quarter_label, policy)
        .into_iter()
        .map(|(quarter, return_pct)| QuarterlyReturn { quarter, return_pct })
        .collect()
}

/// Synthetic quarters for sources that only publish annual figures: each
/// quarter gets a quarter of the annual return, not compounded. The first
/// annual entry is not expanded.
pub fn approximate_quarterly(annual: &[AnnualReturn]) -> Vec<QuarterlyReturn> {
    annual
        .iter()
        .skip(1)
        .flat_map(|entry| {
            let approx = round2(entry.return_pct / 4.0);
            (1..=4).map(move |q| QuarterlyReturn {
                quarter: format!("{}Q{}", entry.year, q),
                return_pct: approx,
            })
        })
        .collect()
}

/// Annual returns published as fractions (0.052 => 5.2%). Output is in
/// ascending year order; a repeated year keeps its last value.
pub fn annual_from_fractions<I>(rows: I) -> Vec<AnnualReturn>
where
    I: IntoIterator<Item = (i32, f64)>,
{
    let by_year: BTreeMap<i32, f64> = rows.into_iter().collect();
    by_year
        .into_iter()
        .map(|(year, fraction)| AnnualReturn {
            year: year.to_string(),
            return_pct: round2(fraction * 100.0),
        })
        .collect()
}

/// Unrounded year-over-year price change as a fraction, `curr / prev - 1`,
/// from each year's last close. Same grouping and skips as `annual_returns`.
pub fn annual_price_changes(prices: &[PricePoint]) -> Vec<(String, f64)> {
    let closes = representative_closes(prices, PricePoint::year_label);
    let years: Vec<(&String, &f64)> = closes.iter().collect();

    years
        .windows(2)
        .filter_map(|pair| {
            let (_, &prev) = pair[0];
            let (year, &curr) = pair[1];
            (prev > 0.0).then(|| (year.clone(), curr / prev - 1.0))
        })
        .collect()
}

pub fn return_values(annual: &[AnnualReturn]) -> Vec<f64> {
    annual.iter().map(|r| r.return_pct).collect()
}
