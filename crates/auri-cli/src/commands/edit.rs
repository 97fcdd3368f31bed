use crate::commands::common::{normalize_message, resolve_review, CliContext, GlobalOptions};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    rating: Option<i64>,
    message: Option<String>,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let message = message.as_deref().and_then(normalize_message);
    if rating.is_none() && message.is_none() {
        return Err(CliError::NothingToEdit);
    }

    let context = CliContext::open(options).await?;
    context.service.restore_session().await;
    let entries = context.service.list_reviews().await;
    let (review_id, existing) = resolve_review(id, &entries)?;

    // Unchanged fields keep their current values.
    let rating = rating.or_else(|| existing.map(|entry| i64::from(entry.review().rating.get())));
    let message = message
        .or_else(|| existing.map(|entry| entry.review().message.clone()))
        .ok_or(CliError::EmptyMessage)?;

    let entry = context
        .service
        .edit_review(&review_id, rating, &message)
        .await?;
    if entry.is_pending() {
        println!("{} (pending sync)", entry.id());
    } else {
        println!("{}", entry.id());
    }
    Ok(())
}
