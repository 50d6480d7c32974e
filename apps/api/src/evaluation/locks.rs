use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per candidate id. Evaluations of different candidates never
/// contend; two evaluations of the same candidate run one after the other.
#[derive(Default)]
pub struct CandidateLocks {
    slots: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl CandidateLocks {
    pub async fn acquire(&self, candidate_id: Uuid) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            // slots nobody holds or waits on
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(candidate_id).or_default().clone()
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}
