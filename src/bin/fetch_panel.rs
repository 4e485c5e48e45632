// src/bin/fetch_panel.rs
use anyhow::Context;
use dotenv::dotenv;
use log::info;

use returns_dataset::config::Config;
use returns_dataset::handlers::panel::{fetch_panel, panel_tickers, write_panel};
use returns_dataset::services::universe::read_symbols;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    let symbols = read_symbols(&config.sp500_csv)
        .with_context(|| format!("reading {}", config.sp500_csv.display()))?;
    let tickers = panel_tickers(&symbols);
    info!("Fetching {} tickers with {} workers", tickers.len(), config.fetch_workers);

    let outcome = fetch_panel(tickers, config.fetch_workers, config.fetch_timeout).await?;
    write_panel(&config.panel_csv, &outcome.rows)
        .with_context(|| format!("writing {}", config.panel_csv.display()))?;

    info!(
        "Wrote: {} rows: {} tickers_failed: {}",
        config.panel_csv.display(),
        outcome.rows.len(),
        outcome.failures.len()
    );
    Ok(())
}
