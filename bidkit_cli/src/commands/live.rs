use std::time::Duration;

use anyhow::{Context, Result};
use bidkit_lib::{AdUnit, CachedBid, FetchOrchestrator};
use clap::Args;
use tokio::sync::oneshot;

use crate::output::{print_bids, OutputFormat};

#[derive(Args)]
pub struct LiveArgs {
    /// Ad unit as TYPE:PLACEMENT[:WxH], e.g. banner:home-top:320x50 or i:splash
    pub ad_unit: String,

    /// Time budget in milliseconds (defaults to BIDKIT_LIVE_TIME_BUDGET_MS, then 8000)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

pub async fn run(args: &LiveArgs, engine: &FetchOrchestrator, format: &OutputFormat) -> Result<()> {
    let ad_unit: AdUnit = args
        .ad_unit
        .parse()
        .with_context(|| format!("invalid ad unit '{}'", args.ad_unit))?;
    let budget = args
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| engine.config().live_time_budget());

    let (tx, rx) = oneshot::channel::<Option<CachedBid>>();
    let started = tokio::time::Instant::now();
    engine.request_live_bid(&ad_unit, budget, move |outcome: Option<CachedBid>| {
        let _ = tx.send(outcome);
    });
    let outcome = rx.await.context("live request dropped its callback")?;

    eprintln!(
        "Live request resolved in {} ms (budget {} ms)",
        started.elapsed().as_millis(),
        budget.as_millis()
    );
    if outcome.is_none() {
        eprintln!("No bid for {}", args.ad_unit);
    }
    print_bids(outcome.as_slice(), format);
    Ok(())
}
