//! vote-herald adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `parliament`: Assembleia da República initiatives feed
//! - `state`: JSON file and in-memory state stores
//! - `github_mirror`: GitHub Actions variable state mirror
//! - `mastodon`: Mastodon posting adapter
//! - `outbox`: JSONL outbox for reviewing posts before publishing

mod state_file;
mod state_memory;

pub mod github_mirror;
pub mod mastodon;
pub mod outbox;
pub mod parliament;

/// Re-exports for state adapters
pub mod state {
    pub use crate::github_mirror::GithubVariableMirror;
    pub use crate::state_file::FileStateStore;
    pub use crate::state_memory::InMemoryStateStore;
}
