//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// Tracklinker - tracking codes, campaign short links and referral attribution
#[derive(Parser)]
#[command(name = "tracklinker")]
#[command(version)]
#[command(about = "Tracking-code registry and referral attribution service", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Generate an example configuration file
    GenerateConfig {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Resolve a code to its kind, owner and redirect target
    Lookup {
        /// Tracking code or short-link code
        code: String,
    },

    /// Issue a bearer token for a profile (local testing only)
    IssueToken {
        /// Profile id placed in the `sub` claim
        profile_id: String,

        /// Token lifetime in minutes
        #[arg(long, default_value_t = 60)]
        minutes: i64,
    },
}
