// src/bin/process_stocks.rs
use anyhow::Context;
use dotenv::dotenv;
use log::info;

use returns_dataset::config::Config;
use returns_dataset::handlers::stocks::{process_universe, Thresholds};
use returns_dataset::services::universe::{read_companies, with_benchmarks};

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Processing S&P 500 stock data...");

    let config = Config::from_env()?;
    let companies = read_companies(&config.sp500_csv)
        .with_context(|| format!("reading {}", config.sp500_csv.display()))?;
    let universe = with_benchmarks(companies);

    let (dataset, report) = process_universe(&config.data_dir, &universe, Thresholds::from(&config));

    dataset
        .write(&config.stock_data_json)
        .with_context(|| format!("writing {}", config.stock_data_json.display()))?;
    report.log_summary(&dataset);
    Ok(())
}
