//! Config command - configuration management

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(path, force).await,
    }
}

async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    write_example(&path).await?;

    println!("Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Pick the legislature and Mastodon instance in the config file");
    println!("  2. Export the access token named by mastodon.access_token_env");
    println!("  3. Run 'vote-herald doctor' to validate your setup");
    println!("  4. Preview with 'vote-herald render', then try 'vote-herald run --dry-run'");

    Ok(())
}

async fn write_example(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    tokio::fs::write(path, AppConfig::example_toml())
        .await
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
