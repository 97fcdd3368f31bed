use auri_core::ResyncOutcome;

use crate::commands::common::{CliContext, GlobalOptions};
use crate::error::CliError;

pub async fn run_sync(options: &GlobalOptions) -> Result<(), CliError> {
    if options.offline {
        return Err(CliError::OfflineMode);
    }

    let context = CliContext::open(options).await?;
    let phase = context.service.initialize().await;
    let count = if phase.is_effectively_online() {
        context.service.list_reviews().await.len()
    } else {
        match context.service.refresh().await {
            ResyncOutcome::Synced { count } => count,
            ResyncOutcome::Failed | ResyncOutcome::Coalesced | ResyncOutcome::Skipped => {
                return Err(CliError::SyncFailed);
            }
        }
    };

    println!("Synced {count} reviews");
    Ok(())
}
