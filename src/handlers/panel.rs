// src/handlers/panel.rs
use csv::Writer;
use log::{error, info, warn};
use reqwest::Client;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};

use crate::handlers::error::{PipelineError, Result};
use crate::models::{PanelRow, PricePoint};
use crate::services::returns::annual_price_changes;
use crate::services::stooq::{fetch_daily_close, SymbolMapper};

/// Always fetched ahead of the constituents.
pub const EXTRA_TICKERS: [&str; 2] = ["^SPX", "BND"];

#[derive(Debug, Default)]
pub struct PanelOutcome {
    pub rows: Vec<PanelRow>,
    pub failures: Vec<String>,
}

pub fn panel_tickers(symbols: &[String]) -> Vec<String> {
    EXTRA_TICKERS
        .iter()
        .map(|t| t.to_string())
        .chain(symbols.iter().cloned())
        .collect()
}

/// Price-only annual returns from year-end closes, as unrounded fractions.
pub fn panel_rows(ticker: &str, closes: &[PricePoint]) -> Vec<PanelRow> {
    annual_price_changes(closes)
        .into_iter()
        .map(|(year, change)| PanelRow {
            ticker: ticker.to_string(),
            year,
            annual_return: change,
        })
        .collect()
}

async fn process_ticker(client: &Client, ticker: &str, symbol: &str) -> Result<Vec<PanelRow>> {
    let closes = fetch_daily_close(client, symbol).await?;
    if closes.is_empty() {
        return Err(PipelineError::EmptySeries(ticker.to_string()));
    }
    Ok(panel_rows(ticker, &closes))
}

// Tasks return only their rows; the ticker is looked up by task id so a
// panicked task is still reported by name.
async fn collect_results(
    tasks: &mut JoinSet<Result<Vec<PanelRow>>>,
    pending: &mut HashMap<Id, String>,
    outcome: &mut PanelOutcome,
) {
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                let ticker = pending.remove(&e.id()).unwrap_or_default();
                error!("✗ {}: fetch task failed: {}", ticker, e);
                outcome.failures.push(ticker);
                continue;
            }
        };
        let ticker = pending.remove(&id).unwrap_or_default();
        match result {
            Ok(rows) if !rows.is_empty() => {
                info!("✓ {}: {} annual returns", ticker, rows.len());
                outcome.rows.extend(rows);
            }
            Ok(_) => {
                warn!("✗ {}: no complete years", ticker);
                outcome.failures.push(ticker);
            }
            Err(e) => {
                warn!("✗ {}: {}", ticker, e);
                outcome.failures.push(ticker);
            }
        }
    }
}

/// Fetch every ticker with at most `workers` requests in flight. A failed
/// ticker is recorded and never affects the others; there are no retries.
pub async fn fetch_panel(tickers: Vec<String>, workers: usize, timeout: Duration) -> Result<PanelOutcome> {
    let client = Client::builder().timeout(timeout).build()?;
    let symbols = SymbolMapper::new()?;
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    let mut pending = HashMap::new();
    let mut outcome = PanelOutcome::default();

    for ticker in tickers {
        let symbol = match symbols.to_stooq(&ticker) {
            Ok(symbol) => symbol,
            Err(e) => {
                warn!("✗ {}: {}", ticker, e);
                outcome.failures.push(ticker);
                continue;
            }
        };
        let client = client.clone();
        let permits = Arc::clone(&permits);
        let name = ticker.clone();
        let handle = tasks.spawn(async move {
            // the semaphore is never closed
            let _permit = permits.acquire_owned().await.ok();
            process_ticker(&client, &name, &symbol).await
        });
        pending.insert(handle.id(), ticker);
    }

    collect_results(&mut tasks, &mut pending, &mut outcome).await;

    outcome
        .rows
        .sort_by(|a, b| a.ticker.cmp(&b.ticker).then_with(|| a.year.cmp(&b.year)));
    outcome.failures.sort();
    Ok(outcome)
}

pub fn write_panel(path: &Path, rows: &[PanelRow]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(["ticker", "year", "annual_return"])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
