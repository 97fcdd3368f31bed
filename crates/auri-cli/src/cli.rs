use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "auri")]
#[command(about = "Read and write Auri reviews from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name for backend configuration and local storage
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Directory for the local session and review cache
    #[arg(long, global = true, value_name = "PATH")]
    pub storage_dir: Option<PathBuf>,

    /// Work from the local cache without contacting the server
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List reviews, newest first
    List {
        /// Number of reviews to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Submit a review
    #[command(alias = "new")]
    Add {
        /// Review message
        message: Vec<String>,
        /// Display name (defaults to your account name, or "Guest")
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
        /// Star rating from 1 to 5
        #[arg(short, long)]
        rating: Option<i64>,
    },
    /// Edit one of your reviews
    Edit {
        /// Review ID or unique ID prefix
        id: String,
        /// New star rating
        #[arg(short, long)]
        rating: Option<i64>,
        /// New message
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Delete one of your reviews
    Delete {
        /// Review ID or unique ID prefix
        id: String,
    },
    /// Refetch reviews from the server
    Sync,
    /// Show the rating summary and sync status
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in, out, or inspect the current session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Appwrite endpoint, e.g. <https://cloud.appwrite.io/v1>
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,
        /// Appwrite project id
        #[arg(long, value_name = "ID")]
        project_id: Option<String>,
        /// Appwrite database id
        #[arg(long, value_name = "ID")]
        database_id: Option<String>,
        /// Appwrite reviews collection id
        #[arg(long, value_name = "ID")]
        reviews_collection_id: Option<String>,
        /// Version tag stored on submitted reviews
        #[arg(long, value_name = "VERSION")]
        app_version: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create an account and sign in
    Signup {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
        /// Display name
        #[arg(long, value_name = "NAME", default_value = "")]
        name: String,
    },
    /// Show who this profile is signed in as
    Status,
    /// Sign out and clear the stored session
    Logout,
}
