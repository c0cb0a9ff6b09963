//! Publication pipeline use case - dedupes, groups, renders and posts votes

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use time::Date;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    compute_thread_key,
    model::{
        PublicationState, RunReport, ThreadGroup, ThreadHandle, VoteOutcome, VoteRecord,
        VoteResult,
    },
    ports::{Poster, SourceError, StateError, StateStore, VoteSource},
    usecases::render::{RenderConfig, VoteRenderer},
};

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Legislature whose votes are published
    pub legislature: String,
    /// Replace the state with every fetched vote marked published, posting nothing
    pub mark_all_as_published: bool,
    /// Mark every unseen vote as skipped, posting nothing
    pub skip_all: bool,
    /// Proceed when the new-vote count exceeds `max_new_votes`
    pub override_too_many_new_votes: bool,
    /// With the override on, new votes dated on or before this day are dropped
    pub override_cutoff: Option<Date>,
    /// More new votes than this in one run means state was probably lost
    pub max_new_votes: usize,
    pub render_config: RenderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            legislature: "XVI".to_string(),
            mark_all_as_published: false,
            skip_all: false,
            override_too_many_new_votes: false,
            override_cutoff: None,
            max_new_votes: 100,
            render_config: RenderConfig::default(),
        }
    }
}

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Vote source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
    #[error("Found {count} new votes (limit {limit}), state might have been lost, aborting")]
    TooManyNewVotes { count: usize, limit: usize },
    #[error("Failed to commit state: {0}")]
    StateCommit(#[from] StateError),
}

/// Publication pipeline orchestrator
pub struct PublishPipeline<S, St, P>
where
    S: VoteSource + ?Sized,
    St: StateStore + ?Sized,
    P: Poster + ?Sized,
{
    source: Arc<S>,
    state_store: Arc<St>,
    poster: Arc<P>,
    renderer: VoteRenderer,
    config: PipelineConfig,
}

impl<S, St, P> PublishPipeline<S, St, P>
where
    S: VoteSource + ?Sized,
    St: StateStore + ?Sized,
    P: Poster + ?Sized,
{
    pub fn new(source: Arc<S>, state_store: Arc<St>, poster: Arc<P>, config: PipelineConfig) -> Self {
        let renderer = VoteRenderer::new(config.render_config.clone());
        Self {
            source,
            state_store,
            poster,
            renderer,
            config,
        }
    }

    /// Run one full pass for the configured legislature
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let span = tracing::info_span!(
            "run",
            run_id = %Uuid::new_v4(),
            legislature = %self.config.legislature
        );
        self.run_pass().instrument(span).await
    }

    async fn run_pass(&self) -> Result<RunReport, PipelineError> {
        let legislature = self.config.legislature.as_str();

        let mut state = self.state_store.load(legislature).await;
        tracing::info!(known_votes = state.len(), "Loaded state");

        tracing::info!("Fetching votes");
        let votes = self.source.fetch_votes(legislature).await?;

        let mut report = RunReport {
            fetched: votes.len(),
            ..Default::default()
        };
        tracing::info!(count = votes.len(), "Fetched votes");

        if self.config.mark_all_as_published {
            tracing::info!(count = votes.len(), "Marking all votes as published");
            state.clear();
            for vote in &votes {
                state.mark_published(&vote.id);
            }
        }

        if self.config.skip_all {
            tracing::info!("Marking unseen votes as skipped");
            for vote in &votes {
                if state.is_new(&vote.id) {
                    state.mark_skipped(&vote.id);
                    report.skipped += 1;
                }
            }
        }

        // A vote repeated in the feed is posted once, first occurrence wins
        let mut seen = HashSet::new();
        let new_votes: Vec<VoteRecord> = votes
            .into_iter()
            .filter(|vote| state.is_new(&vote.id) && seen.insert(vote.id.clone()))
            .collect();
        report.new_votes = new_votes.len();

        if new_votes.is_empty() {
            tracing::info!("No new votes");
            self.commit(&state).await?;
            return Ok(report);
        }

        let new_votes = self.apply_safety_valve(new_votes, &mut state, &mut report)?;

        tracing::info!(count = new_votes.len(), "Posting votes");
        for group in group_by_result(new_votes) {
            self.publish_group(&group, &mut state, &mut report).await;
        }

        self.commit(&state).await?;

        tracing::info!(
            published = report.published,
            errored = report.errored,
            skipped = report.skipped,
            threads = report.threads_opened,
            "Run complete"
        );

        Ok(report)
    }

    /// Refuse suspiciously large batches unless overridden.
    ///
    /// With the override on, votes on or before the cutoff are marked skipped
    /// so they do not come back as new on the next run.
    fn apply_safety_valve(
        &self,
        new_votes: Vec<VoteRecord>,
        state: &mut PublicationState,
        report: &mut RunReport,
    ) -> Result<Vec<VoteRecord>, PipelineError> {
        let limit = self.config.max_new_votes;
        if new_votes.len() <= limit {
            return Ok(new_votes);
        }

        if !self.config.override_too_many_new_votes {
            return Err(PipelineError::TooManyNewVotes {
                count: new_votes.len(),
                limit,
            });
        }

        let Some(cutoff) = self.config.override_cutoff else {
            tracing::warn!(
                count = new_votes.len(),
                limit,
                "Too many new votes, override enabled without cutoff date"
            );
            return Ok(new_votes);
        };

        let (dropped, kept): (Vec<VoteRecord>, Vec<VoteRecord>) =
            new_votes.into_iter().partition(|vote| vote.date <= cutoff);

        tracing::warn!(
            dropped = dropped.len(),
            kept = kept.len(),
            cutoff = %cutoff,
            "Too many new votes, dropping votes on or before cutoff"
        );

        for vote in &dropped {
            state.mark_skipped(&vote.id);
            report.skipped += 1;
        }

        Ok(kept)
    }

    /// Open a thread for the group and reply with each vote in date order
    async fn publish_group(
        &self,
        group: &ThreadGroup,
        state: &mut PublicationState,
        report: &mut RunReport,
    ) {
        let opening = self
            .renderer
            .render_thread_opening(group.result, &group.votes);
        let key = compute_thread_key(&self.config.legislature, group);

        tracing::info!(result = %group.result, count = group.votes.len(), "Starting thread");

        let thread = match self.poster.start_thread(&opening, &key).await {
            Ok(handle) => {
                report.threads_opened += 1;
                handle
            }
            Err(e) => {
                tracing::error!(result = %group.result, error = %e, "Failed to start thread");
                for vote in &group.votes {
                    state.mark_errored(&vote.id);
                    report.errored += 1;
                }
                return;
            }
        };

        for vote in &group.votes {
            match self.publish_vote(vote, thread.as_ref()).await {
                VoteOutcome::Published { post_id } => {
                    tracing::info!(vote_id = %vote.id, post_id = ?post_id, "Published vote");
                    state.mark_published(&vote.id);
                    report.published += 1;
                }
                VoteOutcome::Failed { error } => {
                    tracing::error!(vote_id = %vote.id, error = %error, "Failed to publish vote");
                    state.mark_errored(&vote.id);
                    report.errored += 1;
                }
            }
        }
    }

    async fn publish_vote(&self, vote: &VoteRecord, thread: Option<&ThreadHandle>) -> VoteOutcome {
        let text = self.renderer.render_vote(vote);
        tracing::debug!(vote_id = %vote.id, date = %vote.date, "Posting vote");

        match self.poster.post_reply(&text, thread, &vote.id).await {
            Ok(handle) => VoteOutcome::Published {
                post_id: handle.map(|h| h.id),
            },
            Err(e) => VoteOutcome::Failed {
                error: e.to_string(),
            },
        }
    }

    async fn commit(&self, state: &PublicationState) -> Result<(), PipelineError> {
        self.state_store
            .commit(&self.config.legislature, state)
            .await?;
        tracing::info!(votes = state.len(), "Committed state");
        Ok(())
    }
}

/// Group votes by outcome, approved first, each group sorted by date
pub fn group_by_result(votes: Vec<VoteRecord>) -> Vec<ThreadGroup> {
    let mut by_result: BTreeMap<VoteResult, Vec<VoteRecord>> = BTreeMap::new();
    for vote in votes {
        by_result.entry(vote.result).or_default().push(vote);
    }

    by_result
        .into_iter()
        .map(|(result, votes)| ThreadGroup::new(result, votes))
        .collect()
}
