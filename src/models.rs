// src/models.rs
use serde::{Serialize, Deserialize};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// One daily close for an instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        PricePoint { date, close }
    }

    pub fn year_label(&self) -> String {
        self.date.year().to_string()
    }

    pub fn quarter_label(&self) -> String {
        let quarter = (self.date.month() - 1) / 3 + 1;
        format!("{}Q{}", self.date.year(), quarter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualReturn {
    pub year: String,
    #[serde(rename = "return")]
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyReturn {
    pub quarter: String,
    #[serde(rename = "return")]
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub mean: f64,
    // None for a single observation: the sample deviation has no divisor
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Window length in years -> annualized compounded returns, one per window start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingReturnSet {
    pub windows: BTreeMap<u32, Vec<f64>>,
}

impl RollingReturnSet {
    pub fn get(&self, window: u32) -> Option<&[f64]> {
        self.windows.get(&window).map(|v| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn total_points(&self) -> usize {
        self.windows.values().map(|v| v.len()).sum()
    }
}

// Serialized as {"period1": [...], "period5": [...]} for existing consumers.
impl Serialize for RollingReturnSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.windows.len()))?;
        for (window, values) in &self.windows {
            map.serialize_entry(&format!("period{}", window), values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RollingReturnSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: BTreeMap<String, Vec<f64>> = BTreeMap::deserialize(deserializer)?;
        let mut windows = BTreeMap::new();
        for (key, values) in raw {
            let window = key
                .strip_prefix("period")
                .and_then(|n| n.parse::<u32>().ok())
                .ok_or_else(|| serde::de::Error::custom(format!("bad rolling period key: {}", key)))?;
            windows.insert(window, values);
        }
        Ok(RollingReturnSet { windows })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentRecord {
    pub name: String,
    pub sector: String,
    pub annual_returns: Vec<AnnualReturn>,
    pub quarterly_returns: Vec<QuarterlyReturn>,
    pub stats: Option<Stats>,
    pub data_points: usize,
    pub start_year: String,
    pub end_year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_returns_total: Option<Vec<AnnualReturn>>,
}

/// The reserved entry carrying the benchmark's rolling returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingReturnsRecord {
    pub name: String,
    pub description: String,
    pub periods: RollingReturnSet,
    pub periods_total: RollingReturnSet,
    pub periods_price_only: RollingReturnSet,
    pub start_year: String,
    pub end_year: String,
}

/// Name and sector label of one universe member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyInfo {
    pub name: String,
    pub sector: String,
}

/// One row of the annual macro returns sheet; values are fractions. A blank
/// or unreadable cell only removes that series' value for the year.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualSheetRow {
    pub year: i32,
    pub sp_return: Option<f64>,
    pub tbill: Option<f64>,
    pub tbond10: Option<f64>,
    pub baa_corporate: Option<f64>,
}

/// One row of the flat panel written by the concurrent fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelRow {
    pub ticker: String,
    pub year: String,
    pub annual_return: f64,
}
