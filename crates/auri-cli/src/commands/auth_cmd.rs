use auri_core::SessionStatus;

use crate::cli::AuthCommands;
use crate::commands::common::{CliContext, GlobalOptions};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, options: &GlobalOptions) -> Result<(), CliError> {
    let context = CliContext::open(options).await?;
    let profile_name = &context.profile_name;

    match command {
        AuthCommands::Login { email, password } => {
            let identity = context.service.login(&email, &password).await?;
            context.persist_cookies();
            println!("Signed in profile '{profile_name}' as {}", identity.label());
        }
        AuthCommands::Signup {
            email,
            password,
            name,
        } => {
            let identity = context.service.signup(&email, &password, &name).await?;
            context.persist_cookies();
            println!(
                "Created account and signed in profile '{profile_name}' as {}",
                identity.label()
            );
        }
        AuthCommands::Status => match context.service.restore_session().await {
            SessionStatus::Verified(identity) => {
                println!("Profile '{profile_name}' is signed in as {}", identity.label());
            }
            SessionStatus::Cached(identity) => {
                println!(
                    "Profile '{profile_name}' was signed in as {} (not verified with the server)",
                    identity.label()
                );
            }
            SessionStatus::Anonymous => {
                println!("Profile '{profile_name}' is not signed in.");
            }
        },
        AuthCommands::Logout => {
            context.service.logout().await;
            context.clear_cookies();
            println!("Signed out profile '{profile_name}'");
        }
    }
    Ok(())
}
