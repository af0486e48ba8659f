use crate::compiler::{CompileOutcome, LoaderSet};
use serde_json::Value;
use std::fmt;

/// Called last in every build cycle with the raw compiler error and stats
pub type CompletionHook = Box<dyn FnMut(&CompileOutcome) + Send>;

/// Caller-facing build options, before normalization
pub struct BuildOptions {
    pub watch: bool,
    pub platform: String,
    pub beta: bool,
    pub beta_ui: bool,
    pub compress: bool,
    pub compress_options: Value,
    pub typescript: bool,
    pub huawei: bool,
    pub legacy_web_shell: bool,
    pub rules: Vec<Value>,
    pub loaders: LoaderSet,
    pub plugins: Vec<String>,
    pub analysis: bool,
    pub silent: bool,
    pub complete: Option<CompletionHook>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            watch: false,
            platform: "wx".to_string(),
            beta: false,
            beta_ui: false,
            compress: false,
            compress_options: Value::Null,
            typescript: false,
            huawei: false,
            legacy_web_shell: false,
            rules: Vec::new(),
            loaders: LoaderSet::default(),
            plugins: Vec::new(),
            analysis: false,
            silent: false,
            complete: None,
        }
    }
}

impl BuildOptions {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            ..Self::default()
        }
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_typescript(mut self, typescript: bool) -> Self {
        self.typescript = typescript;
        self
    }

    pub fn with_huawei(mut self, huawei: bool) -> Self {
        self.huawei = huawei;
        self
    }

    pub fn with_legacy_web_shell(mut self, legacy: bool) -> Self {
        self.legacy_web_shell = legacy;
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_loaders(mut self, loaders: LoaderSet) -> Self {
        self.loaders = loaders;
        self
    }

    pub fn on_complete(mut self, hook: impl FnMut(&CompileOutcome) + Send + 'static) -> Self {
        self.complete = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOptions")
            .field("watch", &self.watch)
            .field("platform", &self.platform)
            .field("beta", &self.beta)
            .field("beta_ui", &self.beta_ui)
            .field("compress", &self.compress)
            .field("typescript", &self.typescript)
            .field("huawei", &self.huawei)
            .field("legacy_web_shell", &self.legacy_web_shell)
            .field("loaders", &self.loaders)
            .field("plugins", &self.plugins)
            .field("analysis", &self.analysis)
            .field("silent", &self.silent)
            .field("complete", &self.complete.is_some())
            .finish()
    }
}
