use chrono::Utc;

use crate::commands::common::{
    format_review_lines, review_to_list_item, CliContext, GlobalOptions, ReviewListItem,
};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let context = CliContext::open(options).await?;
    let mut entries = context.service.list_reviews().await;
    entries.truncate(limit);
    let now = Utc::now();

    if as_json {
        let json_items = entries
            .iter()
            .map(|entry| review_to_list_item(entry, now))
            .collect::<Vec<ReviewListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if !context.service.sync_phase().is_effectively_online() {
        eprintln!("Offline: showing cached reviews");
    }
    if entries.is_empty() {
        println!("No reviews yet.");
        return Ok(());
    }
    for line in format_review_lines(&entries, now) {
        println!("{line}");
    }
    Ok(())
}
