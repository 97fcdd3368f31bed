use auri_core::{RatingSummary, ReviewEntry, SyncPhase};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::commands::common::{format_sync_timestamp, render_stars, CliContext, GlobalOptions};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatsItem {
    pub count: usize,
    pub average: f64,
    pub rounded: u8,
    pub pending: usize,
    pub status: &'static str,
    pub last_sync_at: Option<String>,
}

pub fn stats_item(
    summary: RatingSummary,
    entries: &[ReviewEntry],
    phase: SyncPhase,
    last_sync_at: Option<DateTime<Utc>>,
) -> StatsItem {
    StatsItem {
        count: summary.count,
        average: (summary.average * 10.0).round() / 10.0,
        rounded: summary.rounded,
        pending: entries.iter().filter(|entry| entry.is_pending()).count(),
        status: phase.label(),
        last_sync_at: last_sync_at.map(|timestamp| timestamp.to_rfc3339()),
    }
}

pub async fn run_stats(as_json: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let context = CliContext::open(options).await?;
    let entries = context.service.list_reviews().await;
    let summary = RatingSummary::from_entries(&entries);
    let last_sync_at = context.service.last_sync_at();
    let item = stats_item(summary, &entries, context.service.sync_phase(), last_sync_at);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&item)?);
        return Ok(());
    }

    println!(
        "{}  {:.1} from {} reviews",
        render_stars(item.rounded),
        item.average,
        item.count
    );
    if item.pending > 0 {
        println!("{} reviews waiting to sync", item.pending);
    }
    println!(
        "Status: {}  (last sync: {})",
        item.status,
        format_sync_timestamp(last_sync_at)
    );
    Ok(())
}
