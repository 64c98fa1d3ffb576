use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::UserId;

/// One async mutex per user, created on demand and dropped once nobody holds
/// or waits on it. Different users never contend.
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    locks: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
}

/// Exclusive access to one user's balance for as long as it is alive.
#[derive(Debug)]
pub struct UserGuard {
    guard: Option<OwnedMutexGuard<()>>,
    user: UserId,
    locks: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user: &str) -> UserGuard {
        let mutex = Arc::clone(
            self.locks
                .entry(user.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = mutex.lock_owned().await;
        UserGuard {
            guard: Some(guard),
            user: user.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of users with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        // release first so our own guard no longer counts as a holder
        drop(self.guard.take());
        // the map's Arc is the only one left when nobody else is queued
        self.locks
            .remove_if(&self.user, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
