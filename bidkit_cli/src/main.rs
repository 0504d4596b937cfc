mod commands;
mod output;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bidkit_lib::bidkit_api::{Client, Publisher, User};
use bidkit_lib::{EngineConfig, FetchOrchestrator, HttpBidBackend, SystemClock, TelemetryCounters};
use clap::{Parser, Subcommand};
use tokio::runtime::Handle;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "bidkit")]
#[command(about = "Request and inspect in-app bids from the auction backend")]
struct Cli {
    /// Output format: table or json
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Auction backend base URL (defaults to BIDKIT_BASE_URL, then production)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// App bundle id reported to the backend
    #[arg(long, default_value = "com.example.app", global = true)]
    bundle_id: String,

    /// Publisher id reported to the backend
    #[arg(long, default_value = "", global = true)]
    cp_id: String,

    /// Advertising device id
    #[arg(long, global = true)]
    device_id: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "10", global = true)]
    http_timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prefetch one ad unit, then serve it from the cache
    Fetch(commands::fetch::FetchArgs),
    /// Run a live auction against a time budget
    Live(commands::live::LiveArgs),
    /// Prefetch several ad units in one call and list what was cached
    Prefetch(commands::prefetch::PrefetchArgs),
}

fn build_engine(cli: &Cli) -> (FetchOrchestrator, Arc<TelemetryCounters>) {
    let base_url = cli
        .base_url
        .clone()
        .or_else(|| std::env::var("BIDKIT_BASE_URL").ok());
    let timeout = Duration::from_secs(cli.http_timeout);
    let client = match base_url {
        Some(url) => Client::with_timeout(&url, timeout),
        None => Client::new(),
    };

    let publisher = Publisher {
        bundle_id: cli.bundle_id.clone(),
        cp_id: cli.cp_id.clone(),
    };
    let user = User {
        device_id: cli.device_id.clone(),
        ..User::default()
    };
    let clock = Arc::new(SystemClock);
    let backend = HttpBidBackend::new(client, publisher, clock.clone()).with_user(user);

    let telemetry = Arc::new(TelemetryCounters::new());
    let engine = FetchOrchestrator::builder(Arc::new(backend))
        .with_config(Arc::new(EngineConfig::from_env()))
        .with_clock(clock)
        .with_telemetry(telemetry.clone())
        .build(Handle::current());
    (engine, telemetry)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bidkit=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };

    let (engine, telemetry) = build_engine(&cli);

    let result = match &cli.command {
        Commands::Fetch(args) => commands::fetch::run(args, &engine, &format).await,
        Commands::Live(args) => commands::live::run(args, &engine, &format).await,
        Commands::Prefetch(args) => commands::prefetch::run(args, &engine, &format).await,
    };

    engine.on_application_stopped();
    output::print_summary(&telemetry.summary());
    result
}
