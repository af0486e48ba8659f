//! Merge engine: stage the current project, then recombine every staged
//! project into one merged tree.
//!
//! # Directory layout
//!
//! ```text
//! <cache-root>/
//! ├── download/
//! │   ├── <project-a>/...   ← raw staging, one slot per project
//! │   └── <project-b>/...
//! └── merged/
//!     ├── source/...        ← every `source/` subtree, relocated
//!     └── <basename>        ← everything else, flattened
//! ```

use super::classify::{FileRecord, Role};
use super::error::MergeError;
use super::queue::MergeQueue;
use crate::fs::{DirEntry, FileSystem};
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

pub const DOWNLOAD_DIR: &str = "download";
pub const MERGED_DIR: &str = "merged";
pub const SOURCE_DIR: &str = "source";
pub const APP_ENTRY: &str = "app.js";

pub const DEFAULT_MERGE_CONCURRENCY: usize = 32;

/// Top-level entries of a project that are never staged
const EXCLUDED_ENTRIES: &[&str] = &[
    "node_modules",
    "dist",
    "src",
    "sign",
    "build",
    ".CACHE",
    ".chaika_cache",
    "nanachi",
];

/// How to resolve two staged files flattening onto the same merged path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// The file that sorts last wins
    #[default]
    LastWins,
    /// The file that sorts first wins
    FirstWins,
    /// Fail the merge before copying anything
    Error,
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last-wins" => Ok(Self::LastWins),
            "first-wins" => Ok(Self::FirstWins),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "Invalid collision policy: {}. Valid options: last-wins, first-wins, error",
                other
            )),
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LastWins => "last-wins",
            Self::FirstWins => "first-wins",
            Self::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Paths below the cache root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn download_dir(&self) -> PathBuf {
        self.root.join(DOWNLOAD_DIR)
    }

    pub fn staging_dir(&self, project: &str) -> PathBuf {
        self.download_dir().join(project)
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.root.join(MERGED_DIR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub destination: PathBuf,
    pub kept: PathBuf,
    pub dropped: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    /// Top-level entries of the current project that were staged
    pub staged_entries: usize,
    pub copied_files: usize,
    pub ignored_files: usize,
    pub queued_files: usize,
    pub collisions: Vec<Collision>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Neither `source/` nor `app.js` exists; nothing was staged
    NotAProject,
    Staged { project: String, entries: usize },
}

#[derive(Debug, Clone, Copy)]
enum CopyKind {
    File,
    Directory,
}

#[derive(Debug)]
struct CopyJob {
    from: PathBuf,
    to: PathBuf,
    kind: CopyKind,
}

impl CopyJob {
    async fn execute(self, fs: &dyn FileSystem) -> Result<(), MergeError> {
        let result = match self.kind {
            CopyKind::File => fs.copy_file(&self.from, &self.to).await,
            CopyKind::Directory => fs.copy_dir(&self.from, &self.to).await,
        };
        result.map_err(|source| MergeError::Copy {
            from: self.from,
            to: self.to,
            source,
        })
    }
}

pub struct MergeEngine {
    fs: Arc<dyn FileSystem>,
    layout: CacheLayout,
    concurrency: usize,
    collision_policy: CollisionPolicy,
}

impl MergeEngine {
    pub fn new(fs: Arc<dyn FileSystem>, layout: CacheLayout) -> Self {
        Self {
            fs,
            layout,
            concurrency: DEFAULT_MERGE_CONCURRENCY,
            collision_policy: CollisionPolicy::default(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Clear the merged output, stage `project_dir`, then recombine all
    /// staged projects. Queued files are appended to `queue`.
    pub async fn run(
        &self,
        project_dir: &Path,
        queue: &mut MergeQueue,
    ) -> Result<MergeReport, MergeError> {
        let merged = self.layout.merged_dir();
        self.fs
            .empty_dir(&merged)
            .await
            .map_err(|source| MergeError::ClearOutput {
                path: merged.clone(),
                source,
            })?;

        let staged = self.stage_current_project(project_dir).await?;
        let mut report = self.recombine(queue).await?;
        if let StageOutcome::Staged { entries, .. } = staged {
            report.staged_entries = entries;
        }

        info!(
            copied = report.copied_files,
            queued = report.queued_files,
            ignored = report.ignored_files,
            collisions = report.collisions.len(),
            "Merge complete"
        );
        Ok(report)
    }

    /// Phase 1: copy the working project into its staging slot
    pub async fn stage_current_project(
        &self,
        project_dir: &Path,
    ) -> Result<StageOutcome, MergeError> {
        if !self.fs.exists(&project_dir.join(SOURCE_DIR))
            && !self.fs.exists(&project_dir.join(APP_ENTRY))
        {
            debug!(
                dir = %project_dir.display(),
                "No source directory or app entry, skipping staging"
            );
            return Ok(StageOutcome::NotAProject);
        }

        let project = project_name(project_dir);
        let staging = self.layout.staging_dir(&project);
        let entries = self
            .fs
            .read_dir(project_dir)
            .map_err(|source| MergeError::Enumerate {
                path: project_dir.to_path_buf(),
                source,
            })?;

        let jobs: Vec<CopyJob> = entries
            .into_iter()
            .filter(|entry| !self.is_excluded_entry(entry))
            .map(|entry| CopyJob {
                to: staging.join(&entry.name),
                kind: if entry.is_dir() {
                    CopyKind::Directory
                } else {
                    CopyKind::File
                },
                from: entry.path,
            })
            .collect();

        let count = jobs.len();
        debug!(project = %project, entries = count, "Staging current project");
        self.copy_all(jobs).await?;

        Ok(StageOutcome::Staged {
            project,
            entries: count,
        })
    }

    /// Phase 2: classify every staged file and copy pass-through files
    /// into the merged tree
    pub async fn recombine(&self, queue: &mut MergeQueue) -> Result<MergeReport, MergeError> {
        let download = self.layout.download_dir();
        let files = self
            .fs
            .walk_files(&download)
            .map_err(|source| MergeError::Enumerate {
                path: download.clone(),
                source,
            })?;

        let merged = self.layout.merged_dir();
        let mut report = MergeReport::default();
        let mut planned: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

        for file in files {
            let relative = file
                .strip_prefix(&download)
                .unwrap_or(file.as_path())
                .to_path_buf();
            let record = FileRecord::new(file, owning_project(&relative));

            match record.role {
                Role::Ignore => {
                    trace!(file = %record.path.display(), "Ignoring staged file");
                    report.ignored_files += 1;
                }
                Role::Merge | Role::Lock => {
                    trace!(
                        file = %record.path.display(),
                        role = %record.role,
                        "Queueing staged file"
                    );
                    queue.add(record.path, record.role);
                    report.queued_files += 1;
                }
                Role::PassThrough => {
                    let destination = merged_destination(&merged, &relative);
                    self.plan_copy(&mut planned, &mut report, destination, record.path)?;
                }
            }
        }

        let jobs: Vec<CopyJob> = planned
            .into_iter()
            .map(|(to, from)| CopyJob {
                from,
                to,
                kind: CopyKind::File,
            })
            .collect();
        report.copied_files = jobs.len();
        self.copy_all(jobs).await?;

        Ok(report)
    }

    fn plan_copy(
        &self,
        planned: &mut BTreeMap<PathBuf, PathBuf>,
        report: &mut MergeReport,
        destination: PathBuf,
        source: PathBuf,
    ) -> Result<(), MergeError> {
        match planned.entry(destination) {
            Entry::Vacant(slot) => {
                slot.insert(source);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get().clone();
                let collision = match self.collision_policy {
                    CollisionPolicy::Error => {
                        return Err(MergeError::Collision {
                            destination: slot.key().clone(),
                            first: existing,
                            second: source,
                        });
                    }
                    CollisionPolicy::FirstWins => Collision {
                        destination: slot.key().clone(),
                        kept: existing,
                        dropped: source,
                    },
                    CollisionPolicy::LastWins => {
                        slot.insert(source.clone());
                        Collision {
                            destination: slot.key().clone(),
                            kept: source,
                            dropped: existing,
                        }
                    }
                };
                warn!(
                    destination = %collision.destination.display(),
                    kept = %collision.kept.display(),
                    dropped = %collision.dropped.display(),
                    "Merged file collision"
                );
                report.collisions.push(collision);
            }
        }
        Ok(())
    }

    fn is_excluded_entry(&self, entry: &DirEntry) -> bool {
        EXCLUDED_ENTRIES.contains(&entry.file_name())
            || entry.file_name().starts_with('.')
            || self.layout.root().starts_with(entry.path())
    }

    /// Run every copy concurrently, bounded by the engine's limit. The first
    /// failure is returned at once; copies already spawned keep running.
    async fn copy_all(&self, jobs: Vec<CopyJob>) -> Result<(), MergeError> {
        if jobs.is_empty() {
            return Ok(());
        }

        let limiter = Arc::new(Semaphore::new(self.concurrency));
        let mut pending: FuturesUnordered<JoinHandle<Result<(), MergeError>>> = jobs
            .into_iter()
            .map(|job| {
                let fs = Arc::clone(&self.fs);
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    let _permit = limiter
                        .acquire_owned()
                        .await
                        .map_err(|_| MergeError::LimiterClosed)?;
                    job.execute(fs.as_ref()).await
                })
            })
            .collect();

        while let Some(joined) = pending.next().await {
            joined??;
        }
        Ok(())
    }
}

fn project_name(project_dir: &Path) -> String {
    project_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

fn owning_project(relative: &Path) -> String {
    relative
        .components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Where a staged file (relative to the download dir) lands in the merged
/// tree: below `source/` if any parent directory is named `source`,
/// otherwise flattened to its basename.
pub fn merged_destination(merged_dir: &Path, relative: &Path) -> PathBuf {
    let components: Vec<Component<'_>> = relative.components().collect();
    let parents = components.len().saturating_sub(1);
    let source_at = components[..parents]
        .iter()
        .rposition(|c| c.as_os_str() == SOURCE_DIR);

    match source_at {
        Some(index) => {
            let mut destination = merged_dir.join(SOURCE_DIR);
            for component in &components[index + 1..] {
                destination.push(component.as_os_str());
            }
            destination
        }
        None => match relative.file_name() {
            Some(name) => merged_dir.join(name),
            None => merged_dir.to_path_buf(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use std::time::Duration;

    const CACHE: &str = "/work/app/.CACHE";

    fn engine(fs: Arc<MockFileSystem>) -> MergeEngine {
        MergeEngine::new(fs, CacheLayout::new(CACHE))
    }

    #[test]
    fn test_merged_destination_relocates_source() {
        let merged = Path::new("/m");
        assert_eq!(
            merged_destination(merged, Path::new("proj/source/bar/baz.js")),
            PathBuf::from("/m/source/bar/baz.js")
        );
    }

    #[test]
    fn test_merged_destination_uses_last_source_segment() {
        let merged = Path::new("/m");
        assert_eq!(
            merged_destination(merged, Path::new("proj/source/lib/source/a.js")),
            PathBuf::from("/m/source/a.js")
        );
    }

    #[test]
    fn test_merged_destination_flattens_other_paths() {
        let merged = Path::new("/m");
        assert_eq!(
            merged_destination(merged, Path::new("proj/assets/img/logo.png")),
            PathBuf::from("/m/logo.png")
        );
        // A file literally named `source` is not a source directory.
        assert_eq!(
            merged_destination(merged, Path::new("proj/source")),
            PathBuf::from("/m/source")
        );
    }

    #[test]
    fn test_collision_policy_parse() {
        assert_eq!(
            "last-wins".parse::<CollisionPolicy>(),
            Ok(CollisionPolicy::LastWins)
        );
        assert_eq!(
            "FIRST-WINS".parse::<CollisionPolicy>(),
            Ok(CollisionPolicy::FirstWins)
        );
        assert_eq!("error".parse::<CollisionPolicy>(), Ok(CollisionPolicy::Error));
        assert!("newest".parse::<CollisionPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_stage_skips_non_project() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/work/app/readme.txt", "hi");

        let outcome = engine(fs.clone())
            .stage_current_project(Path::new("/work/app"))
            .await
            .unwrap();

        assert_eq!(outcome, StageOutcome::NotAProject);
        assert_eq!(fs.copy_count(), 0);
    }

    #[tokio::test]
    async fn test_stage_excludes_fixed_entries() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/work/app/source/app.js", "app");
        fs.add_file("/work/app/package.json", "{}");
        fs.add_file("/work/app/node_modules/x/index.js", "x");
        fs.add_file("/work/app/dist/out.js", "out");
        fs.add_file("/work/app/.git/HEAD", "ref");
        fs.add_file("/work/app/.CACHE/download/other/a.js", "a");

        let outcome = engine(fs.clone())
            .stage_current_project(Path::new("/work/app"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StageOutcome::Staged {
                project: "app".to_string(),
                entries: 2
            }
        );
        let staged = fs.relative_files("/work/app/.CACHE/download/app");
        assert_eq!(
            staged,
            vec![PathBuf::from("package.json"), PathBuf::from("source/app.js")]
        );
    }

    #[tokio::test]
    async fn test_stage_skips_ancestor_of_nested_cache() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/work/app/source/app.js", "app");
        fs.add_file("/work/app/cache/x/merged/app.js", "old");
        let engine = MergeEngine::new(fs.clone(), CacheLayout::new("/work/app/cache/x"));

        let outcome = engine
            .stage_current_project(Path::new("/work/app"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            StageOutcome::Staged {
                project: "app".to_string(),
                entries: 1
            }
        );
        assert_eq!(
            fs.relative_files("/work/app/cache/x/download/app"),
            vec![PathBuf::from("source/app.js")]
        );
    }

    #[tokio::test]
    async fn test_recombine_routes_by_role() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file(format!("{CACHE}/download/a/app.json"), "{}");
        fs.add_file(format!("{CACHE}/download/a/project.config.json"), "{}");
        fs.add_file(format!("{CACHE}/download/a/README.md"), "# a");
        fs.add_file(format!("{CACHE}/download/a/source/pages/index.js"), "page");
        fs.add_file(format!("{CACHE}/download/a/assets/logo.png"), "png");

        let mut queue = MergeQueue::new();
        let report = engine(fs.clone()).recombine(&mut queue).await.unwrap();

        assert_eq!(report.copied_files, 2);
        assert_eq!(report.queued_files, 2);
        assert_eq!(report.ignored_files, 1);
        assert_eq!(queue.paths_with_role(Role::Lock).len(), 1);
        assert_eq!(
            fs.relative_files(format!("{CACHE}/merged")),
            vec![PathBuf::from("logo.png"), PathBuf::from("source/pages/index.js")]
        );
    }

    #[tokio::test]
    async fn test_last_wins_collision_is_deterministic() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file(format!("{CACHE}/download/a/assets/logo.png"), "from-a");
        fs.add_file(format!("{CACHE}/download/b/logo.png"), "from-b");

        let mut queue = MergeQueue::new();
        let report = engine(fs.clone()).recombine(&mut queue).await.unwrap();

        assert_eq!(report.collisions.len(), 1);
        assert_eq!(
            report.collisions[0].kept,
            PathBuf::from(format!("{CACHE}/download/b/logo.png"))
        );
        assert_eq!(
            fs.content(format!("{CACHE}/merged/logo.png")).as_deref(),
            Some("from-b")
        );
    }

    #[tokio::test]
    async fn test_first_wins_collision() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file(format!("{CACHE}/download/a/logo.png"), "from-a");
        fs.add_file(format!("{CACHE}/download/b/logo.png"), "from-b");

        let mut queue = MergeQueue::new();
        engine(fs.clone())
            .with_collision_policy(CollisionPolicy::FirstWins)
            .recombine(&mut queue)
            .await
            .unwrap();

        assert_eq!(
            fs.content(format!("{CACHE}/merged/logo.png")).as_deref(),
            Some("from-a")
        );
    }

    #[tokio::test]
    async fn test_error_collision_copies_nothing() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file(format!("{CACHE}/download/a/logo.png"), "from-a");
        fs.add_file(format!("{CACHE}/download/b/logo.png"), "from-b");
        fs.add_file(format!("{CACHE}/download/b/other.png"), "other");

        let mut queue = MergeQueue::new();
        let result = engine(fs.clone())
            .with_collision_policy(CollisionPolicy::Error)
            .recombine(&mut queue)
            .await;

        assert!(matches!(result, Err(MergeError::Collision { .. })));
        assert_eq!(fs.copy_count(), 0);
    }

    #[tokio::test]
    async fn test_first_failure_fails_phase_without_cancelling_siblings() {
        let fs = Arc::new(MockFileSystem::new().with_copy_delay(Duration::from_millis(20)));
        for name in ["a.png", "b.png", "c.png", "d.png"] {
            fs.add_file(format!("{CACHE}/download/p/{name}"), name);
        }
        fs.fail_copies_from(format!("{CACHE}/download/p/a.png"));

        let mut queue = MergeQueue::new();
        let result = engine(fs.clone())
            .with_concurrency(8)
            .recombine(&mut queue)
            .await;

        assert!(matches!(result, Err(MergeError::Copy { .. })));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            fs.relative_files(format!("{CACHE}/merged")),
            vec![
                PathBuf::from("b.png"),
                PathBuf::from("c.png"),
                PathBuf::from("d.png")
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrency_limit_of_one_still_copies_everything() {
        let fs = Arc::new(MockFileSystem::new());
        for name in ["a.js", "b.js", "c.js"] {
            fs.add_file(format!("{CACHE}/download/p/source/{name}"), name);
        }

        let mut queue = MergeQueue::new();
        let report = engine(fs.clone())
            .with_concurrency(0)
            .recombine(&mut queue)
            .await
            .unwrap();

        assert_eq!(report.copied_files, 3);
        assert_eq!(fs.copy_count(), 3);
    }

    #[tokio::test]
    async fn test_run_clears_previous_output() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/work/app/app.js", "entry");
        fs.add_file("/work/app/util.js", "util");
        fs.add_file(format!("{CACHE}/merged/stale.js"), "stale");

        let mut queue = MergeQueue::new();
        let report = engine(fs.clone())
            .run(Path::new("/work/app"), &mut queue)
            .await
            .unwrap();

        assert_eq!(report.staged_entries, 2);
        assert!(!fs.exists(Path::new(&format!("{CACHE}/merged/stale.js"))));
        assert_eq!(
            fs.relative_files(format!("{CACHE}/merged")),
            vec![PathBuf::from("util.js")]
        );
        assert_eq!(queue.len(), 1);
    }
}
