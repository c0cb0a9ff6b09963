//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{PostHandle, PublicationState, ThreadHandle, VoteRecord};

/// Error type for vote source operations
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Unknown legislature: {0}")]
    UnknownLegislature(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Malformed feed: {0}")]
    Malformed(String),
}

/// Port for fetching normalized votes of a legislature
#[async_trait]
pub trait VoteSource: Send + Sync {
    /// Fetch every vote recorded for the legislature, flattened
    async fn fetch_votes(&self, legislature: &str) -> Result<Vec<VoteRecord>, SourceError>;
}

/// Error type for state persistence
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("State mirror error: {0}")]
    Mirror(String),
}

/// Port for loading and committing publication state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read prior state; missing or unreadable storage yields an empty state
    async fn load(&self, legislature: &str) -> PublicationState;

    /// Persist the full mapping
    async fn commit(&self, legislature: &str, state: &PublicationState) -> Result<(), StateError>;
}

/// Port for the remote copy of the state, shared across machines
#[async_trait]
pub trait StateMirror: Send + Sync {
    /// Fetch the mirrored state, `Ok(None)` when nothing has been stored yet
    async fn fetch(&self, legislature: &str) -> Result<Option<PublicationState>, StateError>;

    /// Overwrite the mirrored state with `state`
    async fn store(&self, legislature: &str, state: &PublicationState) -> Result<(), StateError>;
}

/// Error type for posting operations
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rejected by server ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Port for publishing threads on the social network
///
/// A `None` handle means the poster accepted the call without delivering
/// anything (dry-run).
#[async_trait]
pub trait Poster: Send + Sync {
    /// Post the root message of a new thread
    async fn start_thread(
        &self,
        text: &str,
        idempotency_key: &str,
    ) -> Result<Option<ThreadHandle>, DeliveryError>;

    /// Post `text` as a reply in `thread`
    async fn post_reply(
        &self,
        text: &str,
        thread: Option<&ThreadHandle>,
        idempotency_key: &str,
    ) -> Result<Option<PostHandle>, DeliveryError>;
}
