//! CLI mode
//!
//! One-shot maintenance commands that run against the configured storage.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::path::Path;

use crate::api::jwt::IdentityVerifier;
use crate::cli::Commands;
use crate::config::{StaticConfig, get_config};
use crate::errors::TrackerError;
use crate::runtime::lifetime;
use crate::storage::CodeKind;

const SAMPLE_CONFIG_PATH: &str = "config.example.toml";

/// Run a non-server command
pub async fn run_cli(command: Commands) -> Result<()> {
    match command {
        Commands::Serve => bail!("serve is handled by server mode"),
        Commands::GenerateConfig { output_path, force } => {
            generate_config(output_path.as_deref().unwrap_or(SAMPLE_CONFIG_PATH), force)
        }
        Commands::Lookup { code } => lookup(&code).await,
        Commands::IssueToken {
            profile_id,
            minutes,
        } => issue_token(&profile_id, minutes),
    }
}

fn generate_config(path: &str, force: bool) -> Result<()> {
    if Path::new(path).exists() && !force {
        bail!("{} already exists, pass --force to overwrite", path);
    }

    StaticConfig::default()
        .save_to_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path, e))?;
    println!("{} {}", "Configuration written to".green(), path.bold());
    Ok(())
}

async fn lookup(code: &str) -> Result<()> {
    let startup = lifetime::startup::prepare_services().await?;

    match startup.services.short_links.resolve(code).await {
        Ok(resolution) => {
            let kind = match resolution.kind {
                CodeKind::Tracking => "tracking code",
                CodeKind::ShortLink => "short link",
            };
            println!("{} {}", "Code:".bold(), resolution.code.cyan());
            println!("{} {}", "Kind:".bold(), kind);
            println!("{} {}", "Owner:".bold(), resolution.owner_profile_id);
            println!("{} {}", "Target:".bold(), resolution.target_url.blue());
            Ok(())
        }
        Err(TrackerError::NotFound(_)) => {
            println!("{} {}", "No active code named".yellow(), code.bold());
            Ok(())
        }
        Err(e) => Err(e).context("Lookup failed"),
    }
}

fn issue_token(profile_id: &str, minutes: i64) -> Result<()> {
    let config = get_config();
    if config.auth.jwt_secret.is_empty() {
        bail!("auth.jwt_secret is not configured; a token signed with a random key is useless");
    }
    if minutes <= 0 {
        bail!("--minutes must be positive");
    }

    let verifier = IdentityVerifier::from_config(&config.auth);
    let token = verifier
        .issue(profile_id, chrono::Duration::minutes(minutes))
        .context("Failed to sign token")?;
    println!("{}", token);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_config_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        generate_config(path, false).unwrap();
        assert!(generate_config(path, false).is_err());
        generate_config(path, true).unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("[attribution]"));
    }
}
