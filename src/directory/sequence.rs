// Monotonic counter behind the school username scheme. The actual increment
// is a single atomic upsert in the store; two concurrent allocations can
// never observe the same value.

use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::store::DirectoryStore;

#[derive(Clone)]
pub struct SequenceAllocator {
    store: Arc<DirectoryStore>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<DirectoryStore>) -> Self {
        SequenceAllocator { store }
    }

    /// Allocate the next sequence number. A caller that gets an error must
    /// not proceed with school creation; the minted username would not be
    /// guaranteed unique.
    pub async fn next(&self) -> AppResult<i64> {
        self.store
            .next_sequence()
            .await
            .map_err(|err| AppError::AllocationFailed(err.to_string()))
    }
}
