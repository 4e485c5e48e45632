// src/config.rs
use log::info;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::handlers::error::{PipelineError, Result};
use crate::services::rolling::DEFAULT_WINDOWS;

/// Paths and thresholds for a pipeline run, read from the environment
/// (a `.env` file is honoured by the binaries via `dotenv`).
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub sp500_csv: PathBuf,
    pub stock_data_json: PathBuf,
    pub sp_returns_csv: PathBuf,
    pub index_closes_path: Option<PathBuf>,
    pub index_dividends_csv: Option<PathBuf>,
    pub output_json: PathBuf,
    pub panel_csv: PathBuf,
    pub min_trading_days: usize,
    pub min_annual_returns: usize,
    pub rolling_windows: Vec<u32>,
    pub fetch_workers: usize,
    pub fetch_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data/daily/us"),
            sp500_csv: PathBuf::from("sp500.csv"),
            stock_data_json: PathBuf::from("stock_data.json"),
            sp_returns_csv: PathBuf::from("spreturns.csv"),
            index_closes_path: None,
            index_dividends_csv: None,
            output_json: PathBuf::from("comprehensive_stock_data.json"),
            panel_csv: PathBuf::from("annual_returns_panel.csv"),
            min_trading_days: 252,
            min_annual_returns: 2,
            rolling_windows: DEFAULT_WINDOWS.to_vec(),
            fetch_workers: 12,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| PipelineError::Config {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_windows(key: &str, value: &str) -> Result<Vec<u32>> {
    value
        .split(',')
        .filter(|w| !w.trim().is_empty())
        .map(|w| parse_value::<u32>(key, w))
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(v) = lookup("DATA_DIR") {
            config.data_dir = v.into();
        }
        if let Some(v) = lookup("SP500_CSV") {
            config.sp500_csv = v.into();
        }
        if let Some(v) = lookup("STOCK_DATA_JSON") {
            config.stock_data_json = v.into();
        }
        if let Some(v) = lookup("SP_RETURNS_CSV") {
            config.sp_returns_csv = v.into();
        }
        config.index_closes_path = lookup("INDEX_CLOSES_PATH").map(PathBuf::from);
        config.index_dividends_csv = lookup("INDEX_DIVIDENDS_CSV").map(PathBuf::from);
        if let Some(v) = lookup("OUTPUT_JSON") {
            config.output_json = v.into();
        }
        if let Some(v) = lookup("PANEL_CSV") {
            config.panel_csv = v.into();
        }
        if let Some(v) = lookup("MIN_TRADING_DAYS") {
            config.min_trading_days = parse_value("MIN_TRADING_DAYS", &v)?;
        }
        if let Some(v) = lookup("MIN_ANNUAL_RETURNS") {
            config.min_annual_returns = parse_value("MIN_ANNUAL_RETURNS", &v)?;
        }
        if let Some(v) = lookup("ROLLING_WINDOWS") {
            config.rolling_windows = parse_windows("ROLLING_WINDOWS", &v)?;
        }
        if let Some(v) = lookup("FETCH_WORKERS") {
            config.fetch_workers = parse_value::<usize>("FETCH_WORKERS", &v)?.max(1);
        }
        if let Some(v) = lookup("FETCH_TIMEOUT_SECS") {
            config.fetch_timeout = Duration::from_secs(parse_value("FETCH_TIMEOUT_SECS", &v)?);
        }

        info!("Configuration loaded: {:?}", config);
        Ok(config)
    }
}
