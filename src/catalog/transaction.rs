//! Transaction handle the catalog accessor is bound to
//!
//! Carries the commit and abort hooks through which statement-scoped resources
//! are released. Exactly one of the two hook lists runs, exactly once.

use crate::common::error::{BindError, BindResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;

/// Transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

type Action = Box<dyn FnOnce() + Send>;

/// Transaction context for managing transaction state
pub struct TransactionContext {
    id: Uuid,
    start_time: u64,
    state: Mutex<TransactionState>,
    must_abort: AtomicBool,
    commit_actions: Mutex<Vec<Action>>,
    abort_actions: Mutex<Vec<Action>>,
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("id", &self.id)
            .field("start_time", &self.start_time)
            .field("state", &*self.state.lock())
            .field("must_abort", &self.must_abort())
            .finish()
    }
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            state: Mutex::new(TransactionState::Active),
            must_abort: AtomicBool::new(false),
            commit_actions: Mutex::new(Vec::new()),
            abort_actions: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    /// Flag the transaction so that a later commit turns into an abort
    pub fn set_must_abort(&self) {
        self.must_abort.store(true, Ordering::SeqCst);
    }

    pub fn must_abort(&self) -> bool {
        self.must_abort.load(Ordering::SeqCst)
    }

    pub fn register_commit_action(&self, action: impl FnOnce() + Send + 'static) {
        self.commit_actions.lock().push(Box::new(action));
    }

    pub fn register_abort_action(&self, action: impl FnOnce() + Send + 'static) {
        self.abort_actions.lock().push(Box::new(action));
    }

    /// Commit, or abort instead when the transaction was flagged must-abort.
    /// Returns the final state.
    pub fn commit(&self) -> BindResult<TransactionState> {
        if self.must_abort() {
            self.finish(TransactionState::Aborted)?;
            return Ok(TransactionState::Aborted);
        }
        self.finish(TransactionState::Committed)?;
        Ok(TransactionState::Committed)
    }

    pub fn abort(&self) -> BindResult<()> {
        self.finish(TransactionState::Aborted)
    }

    fn finish(&self, outcome: TransactionState) -> BindResult<()> {
        {
            let mut state = self.state.lock();
            if *state != TransactionState::Active {
                return Err(BindError::Internal(format!(
                    "transaction {} is already {:?}",
                    self.id, *state
                )));
            }
            *state = outcome;
        }

        let commit_actions = std::mem::take(&mut *self.commit_actions.lock());
        let abort_actions = std::mem::take(&mut *self.abort_actions.lock());
        let (run, discarded) = match outcome {
            TransactionState::Committed => (commit_actions, abort_actions),
            _ => (abort_actions, commit_actions),
        };
        debug!(
            txn = %self.id,
            ?outcome,
            actions = run.len(),
            discarded = discarded.len(),
            "finishing transaction"
        );
        drop(discarded);
        for action in run {
            action();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn counters(txn: &TransactionContext) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let commits = Arc::new(AtomicUsize::new(0));
        let aborts = Arc::new(AtomicUsize::new(0));
        let c = commits.clone();
        txn.register_commit_action(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let a = aborts.clone();
        txn.register_abort_action(move || {
            a.fetch_add(1, Ordering::SeqCst);
        });
        (commits, aborts)
    }

    #[test]
    fn test_commit_runs_only_commit_actions() {
        let txn = TransactionContext::new();
        let (commits, aborts) = counters(&txn);
        assert_eq!(txn.commit().unwrap(), TransactionState::Committed);
        assert_eq!(commits.load(Ordering::SeqCst), 1);
        assert_eq!(aborts.load(Ordering::SeqCst), 0);

        // A second finish is rejected and runs nothing
        assert!(txn.abort().is_err());
        assert_eq!(aborts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_must_abort_turns_commit_into_abort() {
        let txn = TransactionContext::new();
        let (commits, aborts) = counters(&txn);
        txn.set_must_abort();
        assert_eq!(txn.commit().unwrap(), TransactionState::Aborted);
        assert_eq!(commits.load(Ordering::SeqCst), 0);
        assert_eq!(aborts.load(Ordering::SeqCst), 1);
        assert_eq!(txn.state(), TransactionState::Aborted);
    }
}
