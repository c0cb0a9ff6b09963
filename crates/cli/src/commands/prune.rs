//! Prune command - delete the account's recent statuses

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use time::{Duration, OffsetDateTime};

use crate::args::PruneArgs;
use crate::commands::run::{build_mastodon_poster, load_api_key};
use crate::config::AppConfig;

pub async fn execute(args: PruneArgs, config_path: Option<PathBuf>) -> Result<()> {
    if args.hours <= 0 {
        bail!("--hours must be positive");
    }

    let config = AppConfig::load(config_path.as_deref())?;
    let access_token = load_api_key(&config.mastodon.access_token_env, "mastodon")?;
    let poster = build_mastodon_poster(&config, access_token);

    let account = poster
        .verify_credentials()
        .await
        .context("Failed to verify Mastodon credentials")?;

    let since = OffsetDateTime::now_utc() - Duration::hours(args.hours);
    let statuses = poster
        .recent_statuses(&account.id, since)
        .await
        .context("Failed to list statuses")?;

    tracing::info!(
        account = %account.acct,
        count = statuses.len(),
        hours = args.hours,
        "Found recent statuses"
    );

    if !args.yes {
        for status in &statuses {
            println!("{}  {}", status.id, status.created_at);
        }
        println!(
            "{} statuses would be deleted from @{}. Re-run with --yes to delete them.",
            statuses.len(),
            account.acct
        );
        return Ok(());
    }

    let mut failed = 0;
    for status in &statuses {
        match poster.delete_status(&status.id).await {
            Ok(()) => tracing::info!(status_id = %status.id, "Deleted status"),
            Err(e) => {
                tracing::error!(status_id = %status.id, error = %e, "Failed to delete status");
                failed += 1;
            }
        }
    }

    println!(
        "Deleted {} of {} statuses",
        statuses.len() - failed,
        statuses.len()
    );

    if failed > 0 {
        bail!("{} statuses could not be deleted", failed);
    }

    Ok(())
}
