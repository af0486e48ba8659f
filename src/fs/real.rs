use super::{DirEntry, FileSystem, FileType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }

    fn entry_type(path: &Path) -> FileType {
        if path.is_file() {
            FileType::File
        } else if path.is_dir() {
            FileType::Directory
        } else {
            FileType::Symlink
        }
    }

    /// Walker with every ignore-file and hidden-entry filter switched off;
    /// staged trees are copied exactly as they are.
    fn walker(root: &Path) -> ignore::Walk {
        WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .build()
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let entries =
            std::fs::read_dir(path).context(format!("Failed to read directory {:?}", path))?;

        let mut result = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = Self::entry_type(&path);

            result.push(DirEntry {
                path,
                name,
                file_type,
            });
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn walk_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for result in Self::walker(root) {
            let entry = result.context(format!("Failed to walk {:?}", root))?;
            if entry.file_type().is_some_and(|t| t.is_file()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .await
            .context(format!("Failed to read file {:?}", path))
    }

    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path)
            .await
            .context(format!("Failed to read file {:?}", path))
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }
        fs::write(path, contents)
            .await
            .context(format!("Failed to write file {:?}", path))
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            self.create_dir_all(parent).await?;
        }
        fs::copy(from, to)
            .await
            .context(format!("Failed to copy {:?} to {:?}", from, to))?;
        Ok(())
    }

    async fn copy_dir(&self, from: &Path, to: &Path) -> Result<()> {
        self.create_dir_all(to).await?;

        let mut entries = Vec::new();
        for result in Self::walker(from) {
            let entry = result.context(format!("Failed to walk {:?}", from))?;
            entries.push(entry);
        }

        for entry in entries {
            let relative = entry
                .path()
                .strip_prefix(from)
                .context("Walked entry outside of copy root")?;
            if relative.as_os_str().is_empty() {
                continue;
            }

            let target = to.join(relative);
            match entry.file_type() {
                Some(t) if t.is_dir() => self.create_dir_all(&target).await?,
                Some(t) if t.is_file() => self.copy_file(entry.path(), &target).await?,
                _ => {}
            }
        }

        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .context(format!("Failed to create directory {:?}", path))
    }

    async fn empty_dir(&self, path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_dir_all(path)
                .await
                .context(format!("Failed to clear directory {:?}", path))?;
        }
        self.create_dir_all(path).await
    }
}
