use super::{DedupMode, Seen};
use std::collections::{HashSet, VecDeque};

/// In-memory copy of the store for the duration of one run.
#[derive(Debug, Clone)]
pub struct DedupSnapshot {
    mode: DedupMode,
    // Oldest first. In cursor mode holds at most the cursor.
    committed: VecDeque<String>,
    index: HashSet<String>,
    staged: Vec<String>,
    // Cursor as loaded; stays the lookup watermark even after mid-run flushes.
    watermark: Option<String>,
    // Cursor mode: ids flushed earlier in this run, newest first.
    flushed_this_run: Vec<String>,
}

impl DedupSnapshot {
    /// Build from persisted ids, oldest first. Blank lines and repeats are
    /// ignored; nothing is evicted until the next flush.
    pub fn new(mode: DedupMode, persisted: Vec<String>) -> Self {
        let mut committed = VecDeque::new();
        let mut index = HashSet::new();

        let ids = persisted
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        match mode {
            DedupMode::Cursor => {
                if let Some(cursor) = ids.last() {
                    index.insert(cursor.clone());
                    committed.push_back(cursor);
                }
            }
            DedupMode::Bounded { .. } => {
                for id in ids {
                    if index.insert(id.clone()) {
                        committed.push_back(id);
                    }
                }
            }
        }

        let watermark = match mode {
            DedupMode::Cursor => committed.back().cloned(),
            DedupMode::Bounded { .. } => None,
        };

        Self {
            mode,
            committed,
            index,
            staged: Vec::new(),
            watermark,
            flushed_this_run: Vec::new(),
        }
    }

    pub fn empty(mode: DedupMode) -> Self {
        Self::new(mode, Vec::new())
    }

    /// Start a new run: the current cursor becomes the watermark.
    pub fn begin_run(&mut self) {
        self.watermark = self.cursor().map(str::to_string);
        self.flushed_this_run.clear();
    }

    pub fn mode(&self) -> DedupMode {
        self.mode
    }

    pub fn cursor(&self) -> Option<&str> {
        match self.mode {
            DedupMode::Cursor => self.committed.back().map(String::as_str),
            DedupMode::Bounded { .. } => None,
        }
    }

    pub fn lookup(&self, id: &str) -> Seen {
        if self.staged.iter().chain(self.flushed_this_run.iter()).any(|s| s == id) {
            return Seen::Delivered;
        }
        match self.mode {
            DedupMode::Cursor if self.watermark.as_deref() == Some(id) => Seen::Watermark,
            DedupMode::Cursor => Seen::New,
            DedupMode::Bounded { .. } if self.index.contains(id) => Seen::Delivered,
            DedupMode::Bounded { .. } => Seen::New,
        }
    }

    /// Returns false if the id was already known.
    pub fn stage(&mut self, id: String) -> bool {
        if self.lookup(&id) != Seen::New {
            return false;
        }
        self.staged.push(id);
        true
    }

    pub fn staged(&self) -> &[String] {
        &self.staged
    }

    /// Committed ids, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.committed.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// What the storage must hold once the staged ids are flushed.
    pub fn retained_after_flush(&self) -> Vec<String> {
        match self.mode {
            DedupMode::Cursor => {
                // Candidates are delivered newest first, so the first id
                // delivered this run is the newest one.
                match self.flushed_this_run.iter().chain(self.staged.iter()).next() {
                    Some(newest) => vec![newest.clone()],
                    None => self.committed.iter().cloned().collect(),
                }
            }
            DedupMode::Bounded { capacity } => {
                let all: Vec<String> = self.committed.iter().chain(self.staged.iter()).cloned().collect();
                let skip = all.len().saturating_sub(capacity);
                all.into_iter().skip(skip).collect()
            }
        }
    }

    /// Fold staged ids into the committed set after a successful persist.
    pub fn commit_staged(&mut self) {
        let retained = self.retained_after_flush();
        self.index = retained.iter().cloned().collect();
        self.committed = retained.into();
        if self.mode == DedupMode::Cursor {
            self.flushed_this_run.append(&mut self.staged);
        }
        self.staged.clear();
    }
}
