use super::classify::Role;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A staged file deferred to the config combiner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeQueueEntry {
    pub path: PathBuf,
    pub role: Role,
}

/// Append-only FIFO of files that need cross-project combination
/// instead of a plain copy. Entries are never changed once added.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeQueue {
    entries: Vec<MergeQueueEntry>,
}

impl MergeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<PathBuf>, role: Role) {
        self.entries.push(MergeQueueEntry {
            path: path.into(),
            role,
        });
    }

    pub fn entries(&self) -> &[MergeQueueEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MergeQueueEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    /// Paths queued under `role`, in enqueue order
    pub fn paths_with_role(&self, role: Role) -> Vec<&Path> {
        self.entries
            .iter()
            .filter(|e| e.role == role)
            .map(|e| e.path.as_path())
            .collect()
    }

    pub fn into_entries(self) -> Vec<MergeQueueEntry> {
        self.entries
    }
}
