//! Per-application serialization of reconciliations.

use std::collections::HashMap;
use std::sync::Arc;

use stack_state::ClusterId;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockKey = (ClusterId, String);

/// Keyed async locks, one per `(cluster, application name)`.
///
/// Two reconciliations of the same application run one after the other;
/// different applications never wait on each other. Entries nobody holds or
/// waits on are pruned on every acquisition.
#[derive(Debug, Clone, Default)]
pub struct ReleaseLocks {
    locks: Arc<Mutex<HashMap<LockKey, Arc<Mutex<()>>>>>,
}

/// Held for the duration of one reconciliation; released on drop.
pub type ReleaseGuard = OwnedMutexGuard<()>;

impl ReleaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, cluster_id: ClusterId, name: &str) -> ReleaseGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((cluster_id, name.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}
