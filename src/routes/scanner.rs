use super::RouteDiscoveryError;
use crate::fs::FileSystem;
use async_trait::async_trait;
use regex::bytes::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use tokio::process::Command;
use tracing::debug;

/// Page scripts opting into the webview capability declare this
pub const WEBVIEW_PATTERN: &str = r"pages:\s*(\btrue\b|\[.+\])";

const PAGES_SEGMENT: &str = "/pages/";

fn webview_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(WEBVIEW_PATTERN).expect("valid regex"))
}

/// Finds page scripts whose source declares the webview capability
#[async_trait]
pub trait RouteScanner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Distinct matching scripts below `pages_dir`, sorted. A missing
    /// directory yields an empty set.
    async fn scan(&self, pages_dir: &Path) -> Result<BTreeSet<PathBuf>, RouteDiscoveryError>;
}

/// Whether any single line of `content` declares the capability. Lines are
/// matched one at a time, the way `grep` does, and need not be valid UTF-8.
fn declares_webview(content: &[u8]) -> bool {
    content
        .split(|byte| *byte == b'\n')
        .any(|line| webview_pattern().is_match(line))
}

/// Reads every `.js` file and matches its lines in process
pub struct TextScanner {
    fs: Arc<dyn FileSystem>,
}

impl TextScanner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl RouteScanner for TextScanner {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn scan(&self, pages_dir: &Path) -> Result<BTreeSet<PathBuf>, RouteDiscoveryError> {
        let files = self
            .fs
            .walk_files(pages_dir)
            .map_err(|source| RouteDiscoveryError::Io {
                path: pages_dir.to_path_buf(),
                source,
            })?;

        let mut routes = BTreeSet::new();
        for file in files {
            if file.extension().and_then(|e| e.to_str()) != Some("js") {
                continue;
            }
            let content =
                self.fs
                    .read_bytes(&file)
                    .await
                    .map_err(|source| RouteDiscoveryError::Io {
                        path: file.clone(),
                        source,
                    })?;
            if declares_webview(&content) {
                routes.insert(file);
            }
        }
        Ok(routes)
    }
}

/// Delegates the search to an external `grep -r -E`, treating every file as text
pub struct GrepScanner {
    program: String,
}

impl GrepScanner {
    pub fn new() -> Self {
        Self::with_program("grep")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GrepScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouteScanner for GrepScanner {
    fn name(&self) -> &'static str {
        "grep"
    }

    async fn scan(&self, pages_dir: &Path) -> Result<BTreeSet<PathBuf>, RouteDiscoveryError> {
        if !pages_dir.is_dir() {
            return Ok(BTreeSet::new());
        }

        let output = Command::new(&self.program)
            .args(["-r", "-a", "-E", "--include=*.js", WEBVIEW_PATTERN])
            .arg(pages_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RouteDiscoveryError::Process {
                command: self.program.clone(),
                message: e.to_string(),
            })?;

        // grep exits with 1 when nothing matched
        match output.status.code() {
            Some(0) => Ok(parse_grep_output(&String::from_utf8_lossy(&output.stdout))),
            Some(1) => Ok(BTreeSet::new()),
            code => Err(RouteDiscoveryError::Process {
                command: self.program.clone(),
                message: format!(
                    "exited with {:?}: {}",
                    code,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }),
        }
    }
}

/// Turn `path:matched line` records into distinct page paths
pub fn parse_grep_output(stdout: &str) -> BTreeSet<PathBuf> {
    stdout
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let path = match line.find(':') {
                Some(index) => &line[..index],
                None => line.trim_end_matches(':'),
            };
            (!path.is_empty() && path.contains(PAGES_SEGMENT)).then(|| PathBuf::from(path))
        })
        .collect()
}

/// Whether an executable named `program` is on `PATH`
pub fn program_on_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Pick the text scanner on Windows or when `grep` is unavailable
pub fn select_scanner(fs: Arc<dyn FileSystem>) -> Box<dyn RouteScanner> {
    if cfg!(windows) || !program_on_path("grep") {
        debug!("Using in-process webview scanner");
        Box::new(TextScanner::new(fs))
    } else {
        debug!("Using grep webview scanner");
        Box::new(GrepScanner::new())
    }
}
