//! In-memory state store for testing and offline mode

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use vote_herald_domain::{PublicationState, StateError, StateMirror, StateStore};

/// In-memory store, keyed by legislature.
///
/// Implements both the local store and the mirror port, so it can stand in
/// for either side.
pub struct InMemoryStateStore {
    states: RwLock<HashMap<String, PublicationState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the store with a state for `legislature`
    pub fn with_state(legislature: &str, state: PublicationState) -> Self {
        let store = Self::new();
        if let Ok(mut states) = store.states.write() {
            states.insert(legislature.to_string(), state);
        }
        store
    }

    /// Current state for `legislature`, if any was stored
    pub fn get(&self, legislature: &str) -> Option<PublicationState> {
        self.states
            .read()
            .ok()
            .and_then(|states| states.get(legislature).cloned())
    }

    fn put(&self, legislature: &str, state: &PublicationState) -> Result<(), StateError> {
        let mut states = self
            .states
            .write()
            .map_err(|e| StateError::Mirror(e.to_string()))?;
        states.insert(legislature.to_string(), state.clone());
        Ok(())
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, legislature: &str) -> PublicationState {
        self.get(legislature).unwrap_or_default()
    }

    async fn commit(&self, legislature: &str, state: &PublicationState) -> Result<(), StateError> {
        self.put(legislature, state)
    }
}

#[async_trait]
impl StateMirror for InMemoryStateStore {
    async fn fetch(&self, legislature: &str) -> Result<Option<PublicationState>, StateError> {
        Ok(self.get(legislature))
    }

    async fn store(&self, legislature: &str, state: &PublicationState) -> Result<(), StateError> {
        self.put(legislature, state)
    }
}
