//! File classification for the merge pass
//!
//! Every staged file is assigned exactly one [`Role`] from its name alone.
//! Directory placement never changes the answer.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Files that carry no value for compilation
const IGNORED_FILES: &[&str] = &["package-lock.json"];

/// Extensions (without the dot) that are dropped
const IGNORED_EXTENSIONS: &[&str] = &["tgz", "log", "rpks"];

/// Files combined across projects by the config combiner
const MERGE_FILES: &[&str] = &["app.json", "app.js", "package.json"];

/// Files of which only one instance may survive across all projects
const LOCK_FILES: &[&str] = &["project.config.json"];

/// What the merge pass does with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Copied verbatim into the merged tree
    PassThrough,
    /// Queued for cross-project combination
    Merge,
    /// Queued; at most one instance is expected
    Lock,
    /// Dropped
    Ignore,
}

impl Role {
    pub fn is_queued(self) -> bool {
        matches!(self, Role::Merge | Role::Lock)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::PassThrough => "pass-through",
            Role::Merge => "merge",
            Role::Lock => "lock",
            Role::Ignore => "ignore",
        };
        write!(f, "{}", name)
    }
}

fn doc_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\.md$").expect("valid regex"))
}

fn generated_framework_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"React\w+\.js$").expect("valid regex"))
}

fn config_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\w+Config\.json$").expect("valid regex"))
}

fn extension(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|ext| ext.to_str())
}

fn is_ignored(name: &str) -> bool {
    IGNORED_FILES.contains(&name)
        || extension(name).is_some_and(|ext| IGNORED_EXTENSIONS.contains(&ext))
        || generated_framework_pattern().is_match(name)
        || doc_file_pattern().is_match(name)
}

fn is_merge_file(name: &str) -> bool {
    MERGE_FILES.contains(&name) || config_file_pattern().is_match(name)
}

/// Map a file name to its role. Total and pure.
pub fn classify(name: &str) -> Role {
    if is_ignored(name) {
        Role::Ignore
    } else if is_merge_file(name) {
        Role::Merge
    } else if LOCK_FILES.contains(&name) {
        Role::Lock
    } else {
        Role::PassThrough
    }
}

/// A staged file with its role fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub basename: String,
    pub extension: Option<String>,
    pub role: Role,
    pub project: String,
}

impl FileRecord {
    pub fn new(path: PathBuf, project: impl Into<String>) -> Self {
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = extension(&basename).map(str::to_string);
        let role = classify(&basename);

        Self {
            path,
            basename,
            extension,
            role,
            project: project.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        lockfile = { "package-lock.json", Role::Ignore },
        tarball = { "dep-1.0.0.tgz", Role::Ignore },
        log = { "npm-debug.log", Role::Ignore },
        rpks = { "bundle.rpks", Role::Ignore },
        readme = { "README.md", Role::Ignore },
        generated_react = { "ReactWX.js", Role::Ignore },
        app_json = { "app.json", Role::Merge },
        app_js = { "app.js", Role::Merge },
        package_json = { "package.json", Role::Merge },
        quick_config = { "quickConfig.json", Role::Merge },
        project_config = { "project.config.json", Role::Lock },
        page_script = { "index.js", Role::PassThrough },
        stylesheet = { "index.scss", Role::PassThrough },
        dotfile_log = { ".log", Role::PassThrough },
        react_lowercase = { "react.js", Role::PassThrough },
    )]
    fn test_classify(name: &str, expected: Role) {
        assert_eq!(classify(name), expected);
    }

    #[test]
    fn test_ignore_takes_precedence_over_merge_pattern() {
        // Matches the config pattern but carries an ignored extension.
        assert_eq!(classify("buildConfig.json.log"), Role::Ignore);
    }

    #[test]
    fn test_classify_is_directory_independent() {
        let top = FileRecord::new(PathBuf::from("/cache/download/a/app.json"), "a");
        let nested = FileRecord::new(PathBuf::from("/cache/download/a/source/x/app.json"), "a");
        assert_eq!(top.role, nested.role);
    }

    #[test]
    fn test_file_record_fields() {
        let record = FileRecord::new(PathBuf::from("/stage/proj/source/pages/index.js"), "proj");

        assert_eq!(record.basename, "index.js");
        assert_eq!(record.extension.as_deref(), Some("js"));
        assert_eq!(record.role, Role::PassThrough);
        assert_eq!(record.project, "proj");
    }

    #[test]
    fn test_queued_roles() {
        assert!(Role::Merge.is_queued());
        assert!(Role::Lock.is_queued());
        assert!(!Role::PassThrough.is_queued());
        assert!(!Role::Ignore.is_queued());
    }
}
