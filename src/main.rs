// src/main.rs
use anyhow::Context;
use dotenv::dotenv;
use log::{info, warn};

use returns_dataset::config::Config;
use returns_dataset::handlers::benchmark::compose_benchmarks;
use returns_dataset::services::dataset::Dataset;

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Building comprehensive dataset...");

    let config = Config::from_env()?;

    // The stock stage output is the primary input; without it nothing is written.
    let mut dataset = Dataset::load(&config.stock_data_json)
        .with_context(|| format!("reading primary document {}", config.stock_data_json.display()))?;
    info!("Loaded {} stocks", dataset.len());

    let report = compose_benchmarks(&mut dataset, &config)?;
    for source in &report.unavailable {
        warn!("Source unavailable, omitted: {}", source);
    }

    dataset
        .write(&config.output_json)
        .with_context(|| format!("writing {}", config.output_json.display()))?;

    info!(
        "Total entries: {} (stocks + indices + bonds), {} benchmark entries added",
        dataset.len(),
        report.added.len()
    );
    Ok(())
}
