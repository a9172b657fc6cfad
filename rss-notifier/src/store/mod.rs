//! Dedup store: the durable record of which entries were already delivered.
//!
//! A run loads a [`DedupSnapshot`] when the store is opened, consults it for
//! every candidate, stages the ids it delivers and finally flushes. Backends
//! only implement [`DedupStore::persist`], which must replace the stored ids
//! atomically.

mod file;
mod memory;
mod snapshot;
mod sqlite;

pub use file::FileDedupStore;
pub use memory::{MemoryBacking, MemoryDedupStore};
pub use snapshot::DedupSnapshot;
pub use sqlite::SqliteDedupStore;

use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How much delivery history the store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DedupMode {
    /// The last `capacity` delivered ids, oldest evicted first.
    Bounded { capacity: usize },
    /// Only the newest delivered id. Meant for feeds that are strictly
    /// ordered, where everything behind the watermark is old news.
    Cursor,
}

/// What the store knows about an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seen {
    New,
    Delivered,
    /// The cursor itself: this entry and everything older was delivered.
    Watermark,
}

#[async_trait]
pub trait DedupStore: Send + Sync {
    fn backend_name(&self) -> String;

    fn snapshot(&self) -> &DedupSnapshot;

    fn snapshot_mut(&mut self) -> &mut DedupSnapshot;

    /// Replace the persisted ids with `ids` (oldest first). Must either fully
    /// succeed or leave the previous contents untouched.
    async fn persist(&mut self, ids: &[String]) -> Result<()>;

    fn begin_run(&mut self) {
        self.snapshot_mut().begin_run();
    }

    fn lookup(&self, id: &str) -> Seen {
        self.snapshot().lookup(id)
    }

    fn contains(&self, id: &str) -> bool {
        self.lookup(id) != Seen::New
    }

    fn stage_commit(&mut self, id: String) {
        self.snapshot_mut().stage(id);
    }

    fn staged(&self) -> &[String] {
        self.snapshot().staged()
    }

    fn len(&self) -> usize {
        self.snapshot().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist staged commits. Returns how many ids were newly recorded; with
    /// nothing staged the backing storage is not touched at all.
    async fn flush(&mut self) -> Result<usize> {
        let staged = self.staged().len();
        if staged == 0 {
            return Ok(0);
        }

        let retained = self.snapshot().retained_after_flush();
        self.persist(&retained).await?;
        self.snapshot_mut().commit_staged();

        tracing::debug!("{}: flushed {} ids, {} retained", self.backend_name(), staged, retained.len());
        Ok(staged)
    }
}
