use super::{DedupMode, DedupSnapshot, DedupStore};
use crate::types::{RelayError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Process-local storage that outlives individual stores, so successive
/// runs in one process (dry runs, tests) see each other's commits.
#[derive(Debug, Clone, Default)]
pub struct MemoryBacking {
    ids: Arc<Mutex<Vec<String>>>,
    reject_writes: Arc<AtomicBool>,
}

impl MemoryBacking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        let backing = Self::default();
        backing.replace(ids.into_iter().map(Into::into).collect());
        backing
    }

    pub fn ids(&self) -> Vec<String> {
        match self.ids.lock() {
            Ok(ids) => ids.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Make subsequent writes fail, leaving the contents as they are.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn replace(&self, ids: Vec<String>) {
        match self.ids.lock() {
            Ok(mut guard) => *guard = ids,
            Err(poisoned) => *poisoned.into_inner() = ids,
        }
    }
}

pub struct MemoryDedupStore {
    backing: MemoryBacking,
    snapshot: DedupSnapshot,
}

impl MemoryDedupStore {
    pub fn open(backing: MemoryBacking, mode: DedupMode) -> Self {
        let snapshot = DedupSnapshot::new(mode, backing.ids());
        Self { backing, snapshot }
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    fn backend_name(&self) -> String {
        "memory".to_string()
    }

    fn snapshot(&self) -> &DedupSnapshot {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut DedupSnapshot {
        &mut self.snapshot
    }

    async fn persist(&mut self, ids: &[String]) -> Result<()> {
        if self.backing.reject_writes.load(Ordering::SeqCst) {
            return Err(RelayError::Store("memory backing rejected the write".to_string()));
        }
        self.backing.replace(ids.to_vec());
        Ok(())
    }
}
