//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::Date;

/// Label the parliament feed uses for an approved vote
pub const APPROVED_LABEL: &str = "Aprovado";

/// Label for a rejected vote (and for any label the feed may add later)
pub const REJECTED_LABEL: &str = "Rejeitado";

/// Author group used when an initiative lists no parliamentary group
pub const DEFAULT_AUTHOR: &str = "Outro";

/// Outcome of a roll-call vote
///
/// Ordering follows the outcome labels, so iterating a sorted collection
/// visits approved votes before rejected ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteResult {
    Approved,
    Rejected,
}

impl VoteResult {
    /// Map a feed label onto an outcome.
    ///
    /// Only the exact approved label counts as approved; anything else,
    /// including labels the feed has never used before, folds into rejected.
    pub fn from_label(label: &str) -> Self {
        if label == APPROVED_LABEL {
            Self::Approved
        } else {
            Self::Rejected
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => APPROVED_LABEL,
            Self::Rejected => REJECTED_LABEL,
        }
    }
}

impl fmt::Display for VoteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Party breakdown of a non-unanimous vote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteBreakdown {
    pub in_favour: Vec<String>,
    pub against: Vec<String>,
    pub abstained: Vec<String>,
    pub absent: Vec<String>,
}

/// How the chamber voted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteDetail {
    Unanimous,
    Breakdown(VoteBreakdown),
}

/// One normalized roll-call vote tied to a legislative initiative
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    /// Feed identifier, unique across a legislature
    pub id: String,
    pub date: Date,
    pub result: VoteResult,
    pub detail: VoteDetail,
    pub title: String,
    pub initiative_type: String,
    /// Authoring parliamentary groups, in feed order
    pub authors: Vec<String>,
    /// Stage of the legislative process the vote belongs to
    pub phase: String,
    /// Link to the initiative text
    pub uri: String,
}

/// Publication status recorded for a vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteStatus {
    Published,
    Errored,
    Skipped,
}

/// Persisted mapping of vote id to publication status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationState {
    votes: BTreeMap<String, VoteStatus>,
}

impl PublicationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff the vote has no recorded status
    pub fn is_new(&self, vote_id: &str) -> bool {
        !self.votes.contains_key(vote_id)
    }

    pub fn status(&self, vote_id: &str) -> Option<VoteStatus> {
        self.votes.get(vote_id).copied()
    }

    pub fn mark_published(&mut self, vote_id: &str) {
        self.votes.insert(vote_id.to_string(), VoteStatus::Published);
    }

    pub fn mark_errored(&mut self, vote_id: &str) {
        self.votes.insert(vote_id.to_string(), VoteStatus::Errored);
    }

    /// Record a vote as skipped unless it already has a status
    pub fn mark_skipped(&mut self, vote_id: &str) {
        self.votes
            .entry(vote_id.to_string())
            .or_insert(VoteStatus::Skipped);
    }

    pub fn clear(&mut self) {
        self.votes.clear();
    }

    /// Merge `other` into `self`, keeping `self`'s entries on conflict
    pub fn merge_missing(&mut self, other: PublicationState) {
        for (id, status) in other.votes {
            self.votes.entry(id).or_insert(status);
        }
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

/// Votes sharing an outcome within one run, ordered by date
#[derive(Debug, Clone)]
pub struct ThreadGroup {
    pub result: VoteResult,
    pub votes: Vec<VoteRecord>,
}

impl ThreadGroup {
    /// Build a group, sorting votes by date ascending.
    ///
    /// The sort is stable, so votes on the same day keep feed order.
    pub fn new(result: VoteResult, mut votes: Vec<VoteRecord>) -> Self {
        votes.sort_by_key(|vote| vote.date);
        Self { result, votes }
    }
}

/// Handle to the root post of a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadHandle {
    pub id: String,
}

/// Handle to a post published as a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHandle {
    pub id: String,
    pub url: Option<String>,
}

/// Outcome of publishing a single vote
#[derive(Debug)]
pub enum VoteOutcome {
    /// Reply accepted; `post_id` is `None` when the poster did not deliver (dry run)
    Published { post_id: Option<String> },
    /// Thread opening or reply failed
    Failed { error: String },
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub new_votes: usize,
    pub threads_opened: usize,
    pub published: usize,
    pub errored: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_label_mapping() {
        assert_eq!(VoteResult::from_label("Aprovado"), VoteResult::Approved);
        assert_eq!(VoteResult::from_label("Rejeitado"), VoteResult::Rejected);
        // Unknown labels fold into rejected
        assert_eq!(VoteResult::from_label("Retirado"), VoteResult::Rejected);
        assert_eq!(VoteResult::from_label("aprovado"), VoteResult::Rejected);
    }

    #[test]
    fn test_mark_is_last_write_wins() {
        let mut state = PublicationState::new();
        assert!(state.is_new("1"));

        state.mark_errored("1");
        state.mark_published("1");
        state.mark_published("1");

        assert!(!state.is_new("1"));
        assert_eq!(state.status("1"), Some(VoteStatus::Published));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_skip_does_not_override_existing_status() {
        let mut state = PublicationState::new();
        state.mark_errored("1");
        state.mark_skipped("1");
        state.mark_skipped("2");

        assert_eq!(state.status("1"), Some(VoteStatus::Errored));
        assert_eq!(state.status("2"), Some(VoteStatus::Skipped));
    }

    #[test]
    fn test_state_serializes_as_flat_object() {
        let mut state = PublicationState::new();
        state.mark_published("110");
        state.mark_errored("111");
        state.mark_skipped("112");

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"110": "published", "111": "errored", "112": "skipped"})
        );

        let parsed: PublicationState = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_merge_missing_prefers_existing_entries() {
        let mut local = PublicationState::new();
        local.mark_published("1");

        let mut remote = PublicationState::new();
        remote.mark_errored("1");
        remote.mark_published("2");

        local.merge_missing(remote);

        assert_eq!(local.status("1"), Some(VoteStatus::Published));
        assert_eq!(local.status("2"), Some(VoteStatus::Published));
    }
}
