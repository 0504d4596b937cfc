use anyhow::{Context, Result};
use bidkit_lib::{AdUnit, FetchOrchestrator};
use clap::Args;

use crate::output::{print_bids, OutputFormat};

#[derive(Args)]
pub struct FetchArgs {
    /// Ad unit as TYPE:PLACEMENT[:WxH], e.g. banner:home-top:320x50 or i:splash
    pub ad_unit: String,

    /// Consume the bid and print its creative (display URL or native title)
    #[arg(long)]
    pub consume: bool,
}

pub async fn run(args: &FetchArgs, engine: &FetchOrchestrator, format: &OutputFormat) -> Result<()> {
    let ad_unit: AdUnit = args
        .ad_unit
        .parse()
        .with_context(|| format!("invalid ad unit '{}'", args.ad_unit))?;

    match engine.prefetch(std::slice::from_ref(&ad_unit)) {
        Some(handle) => handle.await.context("prefetch task failed")?,
        None => eprintln!("No fetch scheduled (kill switch, pacing, or already in flight)"),
    }

    if !args.consume {
        let slot = engine.get_bid_and_prefetch(&ad_unit);
        if slot.is_none() {
            eprintln!("No bid for {}", args.ad_unit);
        }
        print_bids(slot.as_slice(), format);
        return Ok(());
    }

    let Some(bid) = engine.load_bid(&ad_unit) else {
        eprintln!("No bid for {}", args.ad_unit);
        return Ok(());
    };
    eprintln!("Bid at {:.2} CPM", bid.price());
    let creative = match ad_unit.ad_unit_type() {
        bidkit_lib::AdUnitType::Native => bid.consume_native_assets().map(|assets| {
            assets
                .primary_product()
                .map(|product| product.title.clone())
                .unwrap_or_else(|| "(native bid without products)".to_string())
        }),
        ad_unit_type => bid.consume_display_url_for(ad_unit_type),
    };
    match creative {
        Some(creative) => println!("{}", creative),
        None => eprintln!("Bid expired before it could be consumed"),
    }
    Ok(())
}
