use auri_core::ReviewInput;

use crate::commands::common::{resolve_message, CliContext, GlobalOptions};
use crate::error::CliError;

pub async fn run_add(
    message_parts: &[String],
    name: Option<String>,
    rating: Option<i64>,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let message = resolve_message(message_parts)?;

    let context = CliContext::open(options).await?;
    let status = context.service.restore_session().await;
    let acting = status.identity();
    let username = name
        .or_else(|| acting.and_then(|identity| identity.name.clone()))
        .unwrap_or_default();

    let input = ReviewInput::new(username, rating, message);
    let entry = context.service.submit_review(&input, acting).await?;

    if entry.is_pending() {
        println!("{} (pending sync)", entry.id());
    } else {
        println!("{}", entry.id());
    }
    Ok(())
}
