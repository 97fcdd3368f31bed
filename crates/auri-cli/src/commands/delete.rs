use crate::commands::common::{resolve_review, CliContext, GlobalOptions};
use crate::error::CliError;

pub async fn run_delete(id: &str, options: &GlobalOptions) -> Result<(), CliError> {
    let context = CliContext::open(options).await?;
    context.service.restore_session().await;
    let entries = context.service.list_reviews().await;
    let (review_id, _) = resolve_review(id, &entries)?;

    context.service.delete_review(&review_id).await?;
    println!("{review_id}");
    Ok(())
}
