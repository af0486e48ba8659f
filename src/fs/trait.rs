//! FileSystem trait definition

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Type of file system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// A directory entry returned by read_dir
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub file_type: FileType,
}

impl DirEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

/// Abstraction over file system operations for testability
///
/// Queries are synchronous; anything that moves bytes is async so that
/// copies can be fanned out on the runtime.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// List direct children of a directory, sorted by name
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Every regular file below `root`, sorted. A missing root yields nothing.
    fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>>;

    /// Read file contents as string
    async fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Read raw file contents, without any encoding check
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write a file, replacing any previous contents
    async fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Copy one file, creating the parent directories of `to`
    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;

    /// Recursively copy a directory tree into `to`
    async fn copy_dir(&self, from: &Path, to: &Path) -> Result<()>;

    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove everything inside `path`, creating it if missing
    async fn empty_dir(&self, path: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_entry() {
        let entry = DirEntry {
            path: PathBuf::from("/test/file.txt"),
            name: "file.txt".to_string(),
            file_type: FileType::File,
        };
        assert_eq!(entry.path(), Path::new("/test/file.txt"));
        assert_eq!(entry.file_name(), "file.txt");
        assert_eq!(entry.file_type(), FileType::File);
        assert!(!entry.is_dir());
    }

    #[test]
    fn test_dir_entry_directory() {
        let entry = DirEntry {
            path: PathBuf::from("/test/source"),
            name: "source".to_string(),
            file_type: FileType::Directory,
        };
        assert!(entry.is_dir());
    }
}
