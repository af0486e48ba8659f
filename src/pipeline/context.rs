//! Per-invocation build context

use super::options::BuildOptions;
use crate::platform::Platform;
use crate::routes::WebViewRules;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const PLATFORM_ENV: &str = "ANU_ENV";
pub const WEBVIEW_ENV: &str = "ANU_WEBVIEW";

/// Normalized settings for one invocation. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildContext {
    platform: Platform,
    project_dir: PathBuf,
    compress: bool,
    typescript: bool,
    huawei: bool,
    legacy_web_shell: bool,
    webview: Option<WebViewRules>,
}

impl BuildContext {
    pub fn new(
        platform: Platform,
        options: &BuildOptions,
        project_dir: &Path,
        webview: Option<WebViewRules>,
    ) -> Self {
        Self {
            platform,
            project_dir: project_dir.to_path_buf(),
            compress: options.compress,
            typescript: options.typescript,
            huawei: platform == Platform::Quick && options.huawei,
            legacy_web_shell: options.legacy_web_shell,
            webview,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn typescript(&self) -> bool {
        self.typescript
    }

    pub fn huawei(&self) -> bool {
        self.huawei
    }

    pub fn legacy_web_shell(&self) -> bool {
        self.legacy_web_shell
    }

    /// Webview rules; present only for the quick target
    pub fn webview(&self) -> Option<&WebViewRules> {
        self.webview.as_ref()
    }

    pub fn webview_routes(&self) -> &[PathBuf] {
        self.webview.as_ref().map(|w| w.routes.as_slice()).unwrap_or(&[])
    }

    /// `ANU_WEBVIEW` value; unset outside the quick target
    pub fn webview_marker(&self) -> Option<&'static str> {
        self.webview.as_ref().map(WebViewRules::marker)
    }

    /// Environment markers exported to compiler processes
    pub fn env_markers(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(
            PLATFORM_ENV.to_string(),
            self.platform.runtime_marker().to_string(),
        );
        if let Some(marker) = self.webview_marker() {
            env.insert(WEBVIEW_ENV.to_string(), marker.to_string());
        }
        env
    }
}
