use super::{DirEntry, FileSystem, FileType};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MockEntry {
    pub content: Option<String>,
    pub file_type: FileType,
}

/// In-memory file system with failure injection for copy operations
pub struct MockFileSystem {
    files: RwLock<BTreeMap<PathBuf, MockEntry>>,
    failing_sources: RwLock<HashSet<PathBuf>>,
    copy_delay: Option<Duration>,
    copies: AtomicUsize,
    root: PathBuf,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/mock"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            failing_sources: RwLock::new(HashSet::new()),
            copy_delay: None,
            copies: AtomicUsize::new(0),
            root,
        }
    }

    /// Delay every successful copy, so that fan-out ordering is observable
    pub fn with_copy_delay(mut self, delay: Duration) -> Self {
        self.copy_delay = Some(delay);
        self
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.write_files();
        Self::insert_file(&mut files, path, content.to_string());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.write_files();
        Self::ensure_parents(&mut files, &path);
    }

    /// Make every copy whose source is `path` fail
    pub fn fail_copies_from(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        self.failing_sources
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path);
    }

    pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = self.normalize_path(path.as_ref());
        self.read_files().get(&path).and_then(|e| e.content.clone())
    }

    /// Files below `root`, relative to it
    pub fn relative_files(&self, root: impl AsRef<Path>) -> Vec<PathBuf> {
        let root = self.normalize_path(root.as_ref());
        self.read_files()
            .iter()
            .filter(|(path, entry)| entry.file_type == FileType::File && path.starts_with(&root))
            .filter_map(|(path, _)| path.strip_prefix(&root).ok().map(Path::to_path_buf))
            .collect()
    }

    pub fn copy_count(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn read_files(&self) -> RwLockReadGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.files.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_files(&self) -> RwLockWriteGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.files.write().unwrap_or_else(|e| e.into_inner())
    }

    fn insert_file(files: &mut BTreeMap<PathBuf, MockEntry>, path: PathBuf, content: String) {
        if let Some(parent) = path.parent() {
            Self::ensure_parents(files, parent);
        }
        files.insert(
            path,
            MockEntry {
                content: Some(content),
                file_type: FileType::File,
            },
        );
    }

    fn ensure_parents(files: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            files.entry(current.clone()).or_insert(MockEntry {
                content: None,
                file_type: FileType::Directory,
            });
        }
    }

    fn check_copy_allowed(&self, from: &Path) -> Result<()> {
        let failing = self
            .failing_sources
            .read()
            .unwrap_or_else(|e| e.into_inner());
        if failing.contains(from) {
            return Err(anyhow!("Injected copy failure for {:?}", from));
        }
        Ok(())
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.read_files().contains_key(&path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.read_files()
            .get(&path)
            .map(|e| e.file_type == FileType::Directory)
            .unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.read_files()
            .get(&path)
            .map(|e| e.file_type == FileType::File)
            .unwrap_or(false)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = self.normalize_path(path);
        let files = self.read_files();

        if !files.contains_key(&path) {
            return Err(anyhow!("Directory not found: {:?}", path));
        }

        let mut entries: Vec<DirEntry> = files
            .iter()
            .filter(|(file_path, _)| file_path.parent() == Some(path.as_path()))
            .map(|(file_path, entry)| DirEntry {
                path: file_path.clone(),
                name: file_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("")
                    .to_string(),
                file_type: entry.file_type,
            })
            .collect();

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let root = self.normalize_path(root);
        Ok(self
            .read_files()
            .iter()
            .filter(|(path, entry)| entry.file_type == FileType::File && path.starts_with(&root))
            .map(|(path, _)| path.clone())
            .collect())
    }

    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = self.normalize_path(path);
        let files = self.read_files();
        let entry = files
            .get(&path)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))?;

        entry
            .content
            .clone()
            .ok_or_else(|| anyhow!("Not a file: {:?}", path))
    }

    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        self.read_to_string(path).await.map(String::into_bytes)
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let from = self.normalize_path(from);
        let to = self.normalize_path(to);
        self.check_copy_allowed(&from)?;

        if let Some(delay) = self.copy_delay {
            tokio::time::sleep(delay).await;
        }

        let mut files = self.write_files();
        let content = files
            .get(&from)
            .and_then(|e| e.content.clone())
            .ok_or_else(|| anyhow!("File not found: {:?}", from))?;
        Self::insert_file(&mut files, to, content);
        self.copies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn copy_dir(&self, from: &Path, to: &Path) -> Result<()> {
        let from = self.normalize_path(from);
        let to = self.normalize_path(to);
        self.check_copy_allowed(&from)?;

        if let Some(delay) = self.copy_delay {
            tokio::time::sleep(delay).await;
        }

        let mut files = self.write_files();
        if !files.contains_key(&from) {
            return Err(anyhow!("Directory not found: {:?}", from));
        }

        let subtree: Vec<(PathBuf, MockEntry)> = files
            .iter()
            .filter(|(path, _)| path.starts_with(&from))
            .map(|(path, entry)| (path.clone(), entry.clone()))
            .collect();

        Self::ensure_parents(&mut files, &to);
        for (path, entry) in subtree {
            let Ok(relative) = path.strip_prefix(&from) else {
                continue;
            };
            let target = to.join(relative);
            match entry.content {
                Some(content) => Self::insert_file(&mut files, target, content),
                None => Self::ensure_parents(&mut files, &target),
            }
        }
        self.copies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    async fn empty_dir(&self, path: &Path) -> Result<()> {
        let path = self.normalize_path(path);
        let mut files = self.write_files();
        files.retain(|existing, _| existing == &path || !existing.starts_with(&path));
        Self::ensure_parents(&mut files, &path);
        Ok(())
    }
}
