use crate::routes::RouteDiscoveryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{0}")]
    UnsupportedPlatform(String),

    #[error("Watch mode cannot be combined with the legacy web shell")]
    WatchWithLegacyWebShell,

    #[error("Found {} but TypeScript is not enabled; pass --typescript", .0.display())]
    TypeScriptNotEnabled(PathBuf),

    #[error("Route discovery failed: {0}")]
    RouteDiscovery(#[from] RouteDiscoveryError),

    #[error("Pre-build tasks failed: {0:#}")]
    PreBuildTasks(#[source] anyhow::Error),

    #[error("Compiler failed: {0:#}")]
    Compiler(#[source] anyhow::Error),

    #[error("Web post-processing failed: {0:#}")]
    PostProcess(#[source] anyhow::Error),

    #[error("Compilation failed: {0}")]
    FatalCompileError(String),
}

impl BuildError {
    /// Raised before any side effect
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPlatform(_)
                | Self::WatchWithLegacyWebShell
                | Self::TypeScriptNotEnabled(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors() {
        assert!(BuildError::WatchWithLegacyWebShell.is_validation());
        assert!(BuildError::UnsupportedPlatform("x".into()).is_validation());
        assert!(!BuildError::FatalCompileError("boom".into()).is_validation());
    }

    #[test]
    fn test_typescript_message_names_file() {
        let err = BuildError::TypeScriptNotEnabled(PathBuf::from("/app/source/app.tsx"));
        assert!(err.to_string().contains("/app/source/app.tsx"));
    }
}
