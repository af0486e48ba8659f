use super::scanner::RouteScanner;
use super::RouteDiscoveryError;
use crate::logs::LogSink;
use crate::platform::Platform;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Exported as `ANU_WEBVIEW` when at least one page needs the webview runtime
pub const WEBVIEW_SENTINEL: &str = "need_require_webview_file";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebViewPage {
    pub path: PathBuf,
    /// Route below `source/`, without extension (`pages/index/index`)
    pub route: String,
}

/// Pages collected for the quick target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebViewRules {
    /// Every script the scanner matched
    pub routes: Vec<PathBuf>,
    /// Pages the extractor confirmed
    pub pages: Vec<WebViewPage>,
}

impl WebViewRules {
    pub fn marker(&self) -> &'static str {
        if self.pages.is_empty() {
            ""
        } else {
            WEBVIEW_SENTINEL
        }
    }
}

/// Reads page metadata out of a matched script
#[async_trait]
pub trait PageMetadataExtractor: Send + Sync {
    /// `None` when the script turns out not to declare a webview page
    async fn extract(
        &self,
        source_dir: &Path,
        page: &Path,
    ) -> anyhow::Result<Option<WebViewPage>>;
}

/// Accepts every scanned page and derives its route from its location
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteExtractor;

#[async_trait]
impl PageMetadataExtractor for RouteExtractor {
    async fn extract(
        &self,
        source_dir: &Path,
        page: &Path,
    ) -> anyhow::Result<Option<WebViewPage>> {
        let relative = page.strip_prefix(source_dir).unwrap_or(page);
        let route = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");

        Ok(Some(WebViewPage {
            path: page.to_path_buf(),
            route,
        }))
    }
}

pub struct RouteDiscovery {
    scanner: Box<dyn RouteScanner>,
    extractor: Box<dyn PageMetadataExtractor>,
}

impl RouteDiscovery {
    pub fn new(scanner: Box<dyn RouteScanner>) -> Self {
        Self {
            scanner,
            extractor: Box::new(RouteExtractor),
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn PageMetadataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Collect webview pages for the quick target. Returns `None` for every
    /// other platform without touching the filesystem.
    pub async fn discover(
        &self,
        platform: Platform,
        project_dir: &Path,
        logs: &LogSink,
    ) -> Result<Option<WebViewRules>, RouteDiscoveryError> {
        if platform != Platform::Quick {
            return Ok(None);
        }

        let source_dir = project_dir.join("source");
        let pages_dir = source_dir.join("pages");
        let routes: Vec<PathBuf> = self.scanner.scan(&pages_dir).await?.into_iter().collect();
        debug!(
            scanner = self.scanner.name(),
            matched = routes.len(),
            "Scanned for webview pages"
        );

        let extractions = routes.iter().map(|page| {
            let source_dir = &source_dir;
            async move {
                self.extractor
                    .extract(source_dir, page)
                    .await
                    .map_err(|source| RouteDiscoveryError::Extraction {
                        path: page.clone(),
                        source,
                    })
            }
        });
        let pages: Vec<WebViewPage> = try_join_all(extractions)
            .await?
            .into_iter()
            .flatten()
            .collect();

        if !pages.is_empty() {
            info!(pages = pages.len(), "Webview pages found");
            logs.info(format!("webview pages: {}", pages.len()));
        }

        Ok(Some(WebViewRules { routes, pages }))
    }
}
