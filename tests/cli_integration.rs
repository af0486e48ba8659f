//! CLI integration tests
//!
//! These tests verify the command-line interface behavior, including:
//! - Command parsing and validation
//! - Output formatting
//! - Exit codes

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Helper to get the path to the minapack binary
fn minapack_bin() -> PathBuf {
    // In tests, the binary should be at target/debug/minapack
    let mut path = env::current_exe()
        .expect("Failed to get current executable path")
        .parent()
        .expect("No parent")
        .parent()
        .expect("No parent")
        .to_path_buf();

    // If we're in deps/, go up one more level
    if path.ends_with("deps") {
        path = path.parent().expect("No parent").to_path_buf();
    }

    path.join("minapack")
}

/// Runs the binary with every minapack variable cleared
fn minapack(args: &[&str]) -> Command {
    let mut command = Command::new(minapack_bin());
    command.args(args);
    for (key, _) in env::vars() {
        if key.starts_with("MINAPACK_") {
            command.env_remove(key);
        }
    }
    command
}

fn create_mini_app(dir: &TempDir) -> PathBuf {
    let project = dir.path().join("shop");
    let write = |path: &Path, content: &str| {
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create directory");
        fs::write(path, content).expect("Failed to write file");
    };

    write(&project.join("app.js"), "App({})");
    write(&project.join("app.json"), r#"{"pages":["pages/index/index"]}"#);
    write(&project.join("source/pages/index/index.js"), "Page({})");
    write(&project.join("assets/logo.png"), "logo");

    project
}

#[test]
fn test_cli_help() {
    let output = minapack(&["--help"])
        .output()
        .expect("Failed to execute minapack");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("minapack"));
    assert!(stdout.contains("build"));
    assert!(stdout.contains("merge"));
}

#[test]
fn test_cli_version() {
    let output = minapack(&["--version"])
        .output()
        .expect("Failed to execute minapack");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_merge_json_output() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let project = create_mini_app(&temp);

    let output = minapack(&["merge", project.to_str().unwrap(), "--format", "json"])
        .output()
        .expect("Failed to execute minapack");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    assert_eq!(json["report"]["copied_files"], 2);
    assert_eq!(json["report"]["queued_files"], 2);
    assert!(project.join(".CACHE/merged/source/pages/index/index.js").is_file());
}

#[test]
fn test_merge_respects_cache_dir() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let project = create_mini_app(&temp);
    let cache = temp.path().join("shared-cache");

    let output = minapack(&["merge", project.to_str().unwrap()])
        .env("MINAPACK_CACHE_DIR", &cache)
        .output()
        .expect("Failed to execute minapack");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Merge Complete"));
    assert!(cache.join("merged/logo.png").is_file());
}

#[test]
fn test_invalid_configuration_fails() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let project = create_mini_app(&temp);

    let output = minapack(&["merge", project.to_str().unwrap()])
        .env("MINAPACK_MERGE_CONCURRENCY", "0")
        .output()
        .expect("Failed to execute minapack");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Merge concurrency"));
}

#[test]
fn test_build_unsupported_platform() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let project = create_mini_app(&temp);

    let output = minapack(&["build", project.to_str().unwrap(), "-p", "android"])
        .output()
        .expect("Failed to execute minapack");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported platform"));
    assert!(!project.join(".CACHE").exists());
}

#[test]
fn test_build_without_compiler_fails() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let project = create_mini_app(&temp);

    let output = minapack(&["build", project.to_str().unwrap(), "--no-merge"])
        .output()
        .expect("Failed to execute minapack");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No compiler configured"));
}

#[cfg(unix)]
#[test]
fn test_build_with_shell_compiler() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let project = create_mini_app(&temp);
    let script = temp.path().join("bundle.sh");
    fs::write(
        &script,
        "echo '{\"hash\":\"0123456789ab\",\"warnings\":[\"mind the gap\"]}'\n",
    )
    .expect("Failed to write compiler script");
    let compiler = format!("sh {}", script.display());

    let output = minapack(&["build", project.to_str().unwrap(), "--compiler", &compiler])
        .output()
        .expect("Failed to execute minapack");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mind the gap"));
    assert!(stdout.contains("Built wx (1 cycle)"));
    assert!(project.join(".CACHE/merged/logo.png").is_file());
}
