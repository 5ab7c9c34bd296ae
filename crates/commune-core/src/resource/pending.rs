//! In-flight bookkeeping: mutation keys, loading counter and list coalescing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::MutationKey;

/// Keys with a mutation currently in flight.
#[derive(Debug, Default)]
pub(crate) struct PendingMutations {
    keys: Mutex<HashSet<MutationKey>>,
}

impl PendingMutations {
    /// Claim `key`; `None` when another mutation already holds it.
    pub(crate) fn try_begin(&self, key: MutationKey) -> Option<MutationGuard<'_>> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(MutationGuard { owner: self, key })
    }

    pub(crate) fn contains(&self, key: &MutationKey) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Releases its key when dropped, whatever the mutation outcome.
#[derive(Debug)]
pub(crate) struct MutationGuard<'a> {
    owner: &'a PendingMutations,
    key: MutationKey,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.owner
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[derive(Debug, Default)]
struct LoadingState {
    /// Bumped by every clear; guards from an older epoch no longer count.
    epoch: u64,
    active: usize,
}

/// Number of reads and writes currently running for one view.
#[derive(Debug, Default)]
pub(crate) struct LoadingCounter {
    state: Mutex<LoadingState>,
}

impl LoadingCounter {
    pub(crate) fn begin(&self) -> LoadingGuard<'_> {
        let mut state = self.state();
        state.active += 1;
        LoadingGuard {
            counter: self,
            epoch: state.epoch,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state().active > 0
    }

    /// Force the counter to zero; outstanding guards become no-ops.
    pub(crate) fn clear(&self) {
        let mut state = self.state();
        state.epoch += 1;
        state.active = 0;
    }

    fn state(&self) -> MutexGuard<'_, LoadingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct LoadingGuard<'a> {
    counter: &'a LoadingCounter,
    epoch: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.counter.state();
        if state.epoch == self.epoch {
            state.active = state.active.saturating_sub(1);
        }
    }
}

/// One turn per distinct list query. A caller that waited for its turn
/// finds the previous holder's result in the snapshot instead of sending
/// the same request again.
#[derive(Debug, Default)]
pub(crate) struct QueryCoalescer {
    turns: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl QueryCoalescer {
    pub(crate) async fn acquire(&self, key: &str) -> QueryTurn<'_> {
        let turn = Arc::clone(
            self.turns()
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        );
        QueryTurn {
            owner: self,
            key: key.to_string(),
            held: Some(turn.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.turns().len()
    }

    fn turns(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.turns.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds a query's turn. The key is forgotten once nobody holds or awaits it.
pub(crate) struct QueryTurn<'a> {
    owner: &'a QueryCoalescer,
    key: String,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for QueryTurn<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        let mut turns = self.owner.turns();
        if turns
            .get(&self.key)
            .is_some_and(|turn| Arc::strong_count(turn) == 1)
        {
            turns.remove(&self.key);
        }
    }
}
