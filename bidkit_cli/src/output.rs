use bidkit_lib::{CachedBid, Creative, TelemetrySummary};
use chrono::DateTime;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Tabled)]
struct BidRow {
    #[tabled(rename = "Placement")]
    placement: String,
    #[tabled(rename = "Type")]
    ad_unit_type: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "CPM")]
    cpm: String,
    #[tabled(rename = "TTL")]
    ttl: String,
    #[tabled(rename = "Expires")]
    expires: String,
    #[tabled(rename = "Creative")]
    creative: String,
}

fn build_bid_rows(slots: &[CachedBid]) -> Vec<BidRow> {
    slots
        .iter()
        .map(|s| BidRow {
            placement: s.key.placement_id.clone(),
            ad_unit_type: s.key.ad_unit_type.to_string(),
            size: s.key.formatted_size.clone(),
            cpm: format_cpm(s),
            ttl: if s.is_silence() {
                format!("{}s (silence)", s.ttl_secs)
            } else {
                format!("{}s", s.ttl_secs)
            },
            expires: format_timestamp(s.expiry_ms()),
            creative: describe_creative(s.creative.as_ref()),
        })
        .collect()
}

pub fn print_bids(slots: &[CachedBid], format: &OutputFormat) {
    match format {
        OutputFormat::Table => println!("{}", Table::new(build_bid_rows(slots))),
        OutputFormat::Json => print_json(&slots),
    }
}

/// Lifecycle counters go to stderr so stdout stays machine-readable.
pub fn print_summary(summary: &TelemetrySummary) {
    eprintln!(
        "Requested: {}, consumed: {} (total CPM {:.2}), failed fetches: {}",
        summary.bids_requested,
        summary.bids_consumed,
        summary.consumed_cpm_total,
        summary.fetches_failed
    );
}

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

fn format_cpm(slot: &CachedBid) -> String {
    let currency = slot.currency.as_deref().unwrap_or("");
    format!("{:.2} {}", slot.price(), currency).trim_end().to_string()
}

fn describe_creative(creative: Option<&Creative>) -> String {
    match creative {
        Some(Creative::Display { url }) => url.clone(),
        Some(Creative::Native(assets)) => match assets.primary_product() {
            Some(product) => format!("native: {}", product.title),
            None => "native".to_string(),
        },
        None => "-".to_string(),
    }
}

/// Millisecond epoch timestamp as UTC wall-clock time.
pub fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
