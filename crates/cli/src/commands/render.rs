//! Render command - preview the posts for the current feed

use anyhow::{Result, bail};
use serde::Serialize;
use std::path::PathBuf;
use vote_herald_adapters::parliament::ParliamentVoteSource;
use vote_herald_domain::{
    VoteRecord, VoteSource,
    usecases::{RenderConfig, VoteRenderer},
};

use crate::args::RenderArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct RenderedVote {
    id: String,
    date: String,
    result: String,
    effective_chars: usize,
    text: String,
}

pub async fn execute(args: RenderArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let legislature = args
        .legislature
        .unwrap_or_else(|| config.general.legislature.clone())
        .to_uppercase();

    let feeds = config.legislature_feeds();
    if !feeds.contains_key(&legislature) {
        bail!("No feed configured for legislature {}", legislature);
    }

    let source = ParliamentVoteSource::new(feeds);
    let votes = source.fetch_votes(&legislature).await?;

    let renderer = VoteRenderer::new(RenderConfig {
        max_chars: config.mastodon.max_chars,
        ..Default::default()
    });

    let rendered: Vec<RenderedVote> = latest(votes, args.limit)
        .iter()
        .map(|vote| {
            let text = renderer.render_vote(vote);
            RenderedVote {
                id: vote.id.clone(),
                date: vote.date.to_string(),
                result: vote.result.label().to_string(),
                effective_chars: renderer.effective_len(&text, &vote.uri),
                text,
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    if rendered.is_empty() {
        println!("No votes found for legislature {}", legislature);
        return Ok(());
    }

    for vote in &rendered {
        println!(
            "--- vote {} ({}, {} chars) ---",
            vote.id, vote.date, vote.effective_chars
        );
        println!("{}", vote.text);
        println!();
    }

    Ok(())
}

/// The `limit` most recent votes, newest first
fn latest(mut votes: Vec<VoteRecord>, limit: usize) -> Vec<VoteRecord> {
    votes.sort_by(|a, b| b.date.cmp(&a.date));
    votes.truncate(limit);
    votes
}
