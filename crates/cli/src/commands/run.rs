//! Run command - fetch votes and publish the new ones

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use vote_herald_adapters::{
    mastodon::{MastodonPoster, PostingOptions},
    outbox::{OutboxPoster, OutboxWriter},
    parliament::ParliamentVoteSource,
    state::{FileStateStore, GithubVariableMirror},
};
use vote_herald_domain::{
    Poster,
    usecases::{PipelineConfig, PublishPipeline, RenderConfig},
};

use crate::args::RunArgs;
use crate::config::{AppConfig, parse_date};

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let dry_run = args.dry_run || config.general.dry_run;
    let legislature = args
        .legislature
        .clone()
        .unwrap_or_else(|| config.general.legislature.clone())
        .to_uppercase();
    let state_path = args
        .state_path
        .clone()
        .unwrap_or_else(|| config.general.state_path.clone());

    tracing::info!(
        legislature = %legislature,
        dry_run = dry_run,
        state_path = %state_path.display(),
        outbox = ?args.outbox,
        "Starting vote-herald run"
    );

    let feeds = config.legislature_feeds();
    if !feeds.contains_key(&legislature) {
        bail!("No feed configured for legislature {}", legislature);
    }
    let source = Arc::new(ParliamentVoteSource::new(feeds));

    let preview = dry_run || args.outbox.is_some();
    let state_store = Arc::new(build_state_store(&config, state_path, preview)?);
    let poster = build_poster(&config, &args, dry_run).await?;

    let override_cutoff = match args.cutoff_date.as_deref() {
        Some(raw) => Some(parse_date(raw)?),
        None => config.override_cutoff()?,
    };

    let pipeline_config = PipelineConfig {
        legislature,
        mark_all_as_published: args.mark_all_as_published || config.general.mark_all_as_published,
        skip_all: args.skip_all || config.general.skip_all,
        override_too_many_new_votes: args.override_too_many_new_votes
            || config.general.override_too_many_new_votes,
        override_cutoff,
        max_new_votes: config.general.max_new_votes,
        render_config: RenderConfig {
            max_chars: config.mastodon.max_chars,
            ..Default::default()
        },
    };

    let pipeline = PublishPipeline::new(source, state_store, poster, pipeline_config);
    let report = pipeline.run().await?;

    tracing::info!(
        fetched = report.fetched,
        new_votes = report.new_votes,
        threads = report.threads_opened,
        published = report.published,
        errored = report.errored,
        skipped = report.skipped,
        "vote-herald run completed"
    );

    Ok(())
}

fn build_state_store(config: &AppConfig, path: PathBuf, preview: bool) -> Result<FileStateStore> {
    let store = FileStateStore::new(path);

    if !config.mirror.enabled {
        return Ok(store);
    }

    // Previews must not mark votes as published in the shared state
    if preview {
        tracing::info!("State mirror disabled for dry-run and outbox runs");
        return Ok(store);
    }

    if config.mirror.owner.trim().is_empty() || config.mirror.repo.trim().is_empty() {
        bail!("State mirror enabled but owner/repo not configured");
    }

    let token = load_api_key(&config.mirror.token_env, "mirror")?;
    let mirror = GithubVariableMirror::with_base_url(
        token,
        config.mirror.api_base_url.clone(),
        config.mirror.owner.clone(),
        config.mirror.repo.clone(),
        config.mirror.variable_prefix.clone(),
    );

    Ok(store.with_mirror(Arc::new(mirror)))
}

async fn build_poster(config: &AppConfig, args: &RunArgs, dry_run: bool) -> Result<Arc<dyn Poster>> {
    if let Some(outbox_path) = &args.outbox {
        let writer = OutboxWriter::new(outbox_path.clone())
            .await
            .context("Failed to initialize outbox writer")?;

        tracing::info!(outbox = %writer.path().display(), "Writing posts to outbox");
        return Ok(Arc::new(OutboxPoster::new(writer)));
    }

    if dry_run {
        return Ok(Arc::new(MastodonPoster::dry_run()));
    }

    let access_token = load_api_key(&config.mastodon.access_token_env, "mastodon")?;
    Ok(Arc::new(build_mastodon_poster(config, access_token)))
}

pub(crate) fn build_mastodon_poster(config: &AppConfig, access_token: SecretString) -> MastodonPoster {
    MastodonPoster::new(
        access_token,
        config.mastodon.base_url.clone(),
        PostingOptions {
            visibility: config.mastodon.visibility.clone(),
            language: config.mastodon.language.clone(),
        },
    )
}

pub(crate) fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No token env var configured for {}", provider);
    }

    let key = std::env::var(env_var)
        .with_context(|| format!("Missing token env var {} for {}", env_var, provider))?;

    if key.trim().is_empty() {
        bail!("Token env var {} is empty for {}", env_var, provider);
    }

    Ok(SecretString::new(key.into()))
}
