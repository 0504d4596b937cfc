use anyhow::{Context, Result};
use bidkit_lib::{AdUnit, FetchOrchestrator};
use clap::Args;

use crate::output::{print_bids, OutputFormat};

#[derive(Args)]
pub struct PrefetchArgs {
    /// Ad units as TYPE:PLACEMENT[:WxH]; invalid units are skipped
    #[arg(required = true, num_args = 1..)]
    pub ad_units: Vec<String>,
}

pub async fn run(args: &PrefetchArgs, engine: &FetchOrchestrator, format: &OutputFormat) -> Result<()> {
    let mut ad_units = Vec::with_capacity(args.ad_units.len());
    for spec in &args.ad_units {
        match spec.parse::<AdUnit>() {
            Ok(ad_unit) => ad_units.push(ad_unit),
            Err(e) => eprintln!("Skipping '{}': {}", spec, e),
        }
    }

    match engine.prefetch(&ad_units) {
        Some(handle) => handle.await.context("prefetch task failed")?,
        None => eprintln!("No fetch scheduled (kill switch, pacing, or nothing valid to fetch)"),
    }
    if let Some(next_call_at) = engine.pacer().next_call_at_ms() {
        eprintln!("Backend asked for a pause until {}", crate::output::format_timestamp(next_call_at));
    }

    let cached: Vec<_> = ad_units
        .iter()
        .filter_map(|ad_unit| engine.cache_key(ad_unit))
        .filter_map(|key| engine.cache().peek(&key))
        .collect();
    eprintln!("{} of {} ad units cached", cached.len(), ad_units.len());
    print_bids(&cached, format);
    Ok(())
}
