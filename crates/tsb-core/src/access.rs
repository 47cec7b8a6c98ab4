use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{domain::UserId, ports::Storage, Result};

/// Outcome of a failed access attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessVerdict {
    /// Attempts remaining before the user is blocked.
    AttemptsLeft(u32),
    /// The countdown ran out; the block has been persisted.
    NowBlocked,
}

/// Tracks failed `/start` attempts and escalates to a persisted block.
///
/// The countdown lives only in process memory; it is reset by a restart or
/// by [`AccessGate::unblock`]. Block state itself is persisted.
pub struct AccessGate {
    store: Arc<dyn Storage>,
    budget: u32,
    attempts: Mutex<HashMap<UserId, u32>>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn Storage>, budget: u32) -> Self {
        Self {
            store,
            budget: budget.max(1),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_blocked(&self, uid: UserId) -> Result<bool> {
        self.store.is_blocked(uid)
    }

    /// Record one failed attempt for `uid`. When the countdown reaches zero
    /// the user is blocked with `reason` and the counter entry is dropped.
    pub async fn record_failed_access(&self, uid: UserId, reason: &str) -> Result<AccessVerdict> {
        let mut attempts = self.attempts.lock().await;
        let remaining = attempts.entry(uid).or_insert(self.budget);
        *remaining -= 1;

        if *remaining == 0 {
            attempts.remove(&uid);
            self.store.add_blocked_user(uid, reason)?;
            warn!(uid = uid.0, "user blocked after exhausting access attempts");
            return Ok(AccessVerdict::NowBlocked);
        }

        Ok(AccessVerdict::AttemptsLeft(*remaining))
    }

    pub fn block(&self, uid: UserId, reason: &str) -> Result<()> {
        self.store.add_blocked_user(uid, reason)?;
        info!(uid = uid.0, "user blocked by administrator");
        Ok(())
    }

    /// Remove the persisted block and the in-memory countdown. Both must go:
    /// a stale counter would otherwise survive the unblock.
    pub async fn unblock(&self, uid: UserId) -> Result<()> {
        self.store.remove_blocked_user(uid)?;
        self.attempts.lock().await.remove(&uid);
        info!(uid = uid.0, "user unblocked");
        Ok(())
    }
}
