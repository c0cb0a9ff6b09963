//! vote-herald domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Vote records, publication state and run results
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Rendering and the publication pipeline

pub mod model;
pub mod ports;
pub mod usecases;

pub use model::*;
pub use ports::*;

use sha2::{Digest, Sha256};

/// Compute a deterministic idempotency key for a thread opening.
///
/// The key covers the legislature, the outcome and the set of votes in the
/// group, so retrying the same group reuses the same key.
pub fn compute_thread_key(legislature: &str, group: &ThreadGroup) -> String {
    let mut ids: Vec<&str> = group.votes.iter().map(|v| v.id.as_str()).collect();
    ids.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(legislature.as_bytes());
    hasher.update(b":");
    hasher.update(group.result.label().as_bytes());
    for id in ids {
        hasher.update(b":");
        hasher.update(id.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
