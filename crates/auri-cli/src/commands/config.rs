use std::env;

use auri_core::config::{
    normalize_endpoint, ENV_DATABASE_ID, ENV_ENDPOINT, ENV_PROJECT_ID, ENV_REVIEWS_COLLECTION_ID,
};
use auri_core::util::normalize_text_option;
use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::commands::common::{resolve_storage_dir, GlobalOptions};
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Values given to `auri config init`.
#[derive(Debug, Default)]
pub struct ProfileInit {
    pub endpoint: Option<String>,
    pub project_id: Option<String>,
    pub database_id: Option<String>,
    pub reviews_collection_id: Option<String>,
    pub app_version: Option<String>,
}

pub fn run_config(command: ConfigCommands, options: &GlobalOptions) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            endpoint,
            project_id,
            database_id,
            reviews_collection_id,
            app_version,
            no_activate,
        } => run_config_init(
            options.profile.as_deref(),
            ProfileInit {
                endpoint,
                project_id,
                database_id,
                reviews_collection_id,
                app_version,
            },
            no_activate,
        ),
        ConfigCommands::Show => run_config_show(options),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    init: ProfileInit,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged = merge_profile(existing, init, |key| env::var(key).ok())?;
    *config.profile_mut_or_default(&profile_name) = merged.clone();
    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let missing_fields = merged.missing_fields();
    if missing_fields.is_empty() {
        println!("Profile '{profile_name}' is ready. Run `auri list` to fetch reviews.");
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }
    Ok(())
}

/// Explicit flags win over `AURI_APPWRITE_*` variables, which win over the
/// stored profile.
pub fn merge_profile(
    existing: CliProfile,
    init: ProfileInit,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<CliProfile, CliError> {
    let pick = |explicit: Option<String>, env_key: &str, stored: Option<String>| {
        normalize_text_option(explicit)
            .or_else(|| normalize_text_option(env_lookup(env_key)))
            .or_else(|| normalize_text_option(stored))
    };

    let endpoint = pick(init.endpoint, ENV_ENDPOINT, existing.appwrite_endpoint)
        .map(|endpoint| normalize_endpoint(&endpoint))
        .transpose()?;

    Ok(CliProfile {
        appwrite_endpoint: endpoint,
        appwrite_project_id: pick(init.project_id, ENV_PROJECT_ID, existing.appwrite_project_id),
        appwrite_database_id: pick(
            init.database_id,
            ENV_DATABASE_ID,
            existing.appwrite_database_id,
        ),
        appwrite_reviews_collection_id: pick(
            init.reviews_collection_id,
            ENV_REVIEWS_COLLECTION_ID,
            existing.appwrite_reviews_collection_id,
        ),
        app_version: normalize_text_option(init.app_version).or(existing.app_version),
    })
}

#[derive(Debug, Serialize)]
struct ProfileReport<'a> {
    profile: &'a str,
    active: bool,
    storage_dir: String,
    settings: CliProfile,
    missing: Vec<&'static str>,
}

fn run_config_show(options: &GlobalOptions) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(options.profile.as_deref());
    let settings = config.profile(&profile_name).cloned().unwrap_or_default();
    let storage_dir = resolve_storage_dir(options.storage_dir.clone(), &profile_name)?;

    let report = ProfileReport {
        profile: &profile_name,
        active: config.active_profile.as_deref() == Some(profile_name.as_str()),
        storage_dir: storage_dir.display().to_string(),
        missing: settings.missing_fields(),
        settings,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
