//! Webview route discovery for the quick target

mod discovery;
mod scanner;

pub use discovery::{
    PageMetadataExtractor, RouteDiscovery, RouteExtractor, WebViewPage, WebViewRules,
    WEBVIEW_SENTINEL,
};
pub use scanner::{
    parse_grep_output, program_on_path, select_scanner, GrepScanner, RouteScanner, TextScanner,
    WEBVIEW_PATTERN,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteDiscoveryError {
    #[error("Failed to read {}: {source:#}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("{command} failed: {message}")]
    Process { command: String, message: String },

    #[error("Failed to extract page metadata from {}: {source:#}", path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}
