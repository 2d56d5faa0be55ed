use crate::{Store, StoreResult};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared owner of the current snapshot.
///
/// Writers run one at a time under the write lock and swap in a whole new
/// snapshot; readers clone the `Arc` and keep reading it for as long as they
/// like, so no reader ever sees a half-applied write.
#[derive(Debug, Default)]
pub struct StoreHandle {
    current: RwLock<Arc<Store>>,
}

impl StoreHandle {
    pub fn new(store: Store) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// The snapshot current at the time of the call.
    pub fn snapshot(&self) -> Arc<Store> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies an infallible write and publishes the result.
    pub fn update(&self, write: impl FnOnce(&Store) -> Store) -> Arc<Store> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(write(&current));
        *current = Arc::clone(&next);
        next
    }

    /// Applies a fallible write; on error the current snapshot is kept.
    pub fn try_update(
        &self,
        write: impl FnOnce(&Store) -> StoreResult<Store>,
    ) -> StoreResult<Arc<Store>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(write(&current)?);
        *current = Arc::clone(&next);
        Ok(next)
    }
}
