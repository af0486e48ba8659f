//! Tasks that run after the build context is set and before compilation

use super::context::BuildContext;
use crate::logs::LogSink;
use crate::merge::{MergeEngine, MergeQueue, MergeReport};
use crate::platform::Platform;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use std::sync::Mutex;
use tracing::debug;

/// The slice of the build options pre-build tasks see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreBuildRequest {
    pub platform: Platform,
    pub beta: bool,
    pub beta_ui: bool,
    pub compress: bool,
}

#[async_trait]
pub trait PreBuildTasks: Send + Sync {
    async fn run(
        &self,
        request: &PreBuildRequest,
        context: &BuildContext,
        logs: &LogSink,
    ) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreBuildTasks;

#[async_trait]
impl PreBuildTasks for NoPreBuildTasks {
    async fn run(&self, _: &PreBuildRequest, _: &BuildContext, _: &LogSink) -> Result<()> {
        Ok(())
    }
}

/// Runs the merge engine on the project being built
pub struct MergeTask {
    engine: MergeEngine,
    queue: Mutex<MergeQueue>,
    report: Mutex<Option<MergeReport>>,
}

impl MergeTask {
    pub fn new(engine: MergeEngine) -> Self {
        Self {
            engine,
            queue: Mutex::new(MergeQueue::new()),
            report: Mutex::new(None),
        }
    }

    /// Files deferred to the config combiner by the last run
    pub fn queue(&self) -> MergeQueue {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_report(&self) -> Option<MergeReport> {
        self.report
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl PreBuildTasks for MergeTask {
    async fn run(
        &self,
        _request: &PreBuildRequest,
        context: &BuildContext,
        logs: &LogSink,
    ) -> Result<()> {
        let mut queue = MergeQueue::new();
        let report = self
            .engine
            .run(context.project_dir(), &mut queue)
            .await
            .context("Merge failed")?;

        logs.info(format!(
            "merged {} file(s), {} queued for combination",
            report.copied_files, report.queued_files
        ));
        for collision in &report.collisions {
            logs.warning(format!(
                "{} and {} both map to {}; kept {}",
                collision.kept.display(),
                collision.dropped.display(),
                collision.destination.display(),
                collision.kept.display()
            ));
        }

        *self.queue.lock().unwrap_or_else(|e| e.into_inner()) = queue;
        *self.report.lock().unwrap_or_else(|e| e.into_inner()) = Some(report);
        Ok(())
    }
}

/// Runs several task sets concurrently; the first failure wins
#[derive(Default)]
pub struct TaskSet {
    tasks: Vec<Box<dyn PreBuildTasks>>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, task: Box<dyn PreBuildTasks>) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl PreBuildTasks for TaskSet {
    async fn run(
        &self,
        request: &PreBuildRequest,
        context: &BuildContext,
        logs: &LogSink,
    ) -> Result<()> {
        debug!(tasks = self.tasks.len(), "Running pre-build tasks");
        try_join_all(
            self.tasks
                .iter()
                .map(|task| task.run(request, context, logs)),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::logs::LogBuffer;
    use crate::merge::CacheLayout;
    use crate::pipeline::BuildOptions;
    use anyhow::bail;
    use std::path::Path;
    use std::sync::Arc;

    fn request() -> PreBuildRequest {
        PreBuildRequest {
            platform: Platform::Wx,
            beta: false,
            beta_ui: false,
            compress: false,
        }
    }

    fn context() -> BuildContext {
        BuildContext::new(
            Platform::Wx,
            &BuildOptions::default(),
            Path::new("/work/app"),
            None,
        )
    }

    #[tokio::test]
    async fn test_merge_task_records_queue_and_logs() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/work/app/app.js", "entry");
        fs.add_file("/work/app/source/index.js", "index");
        let task = MergeTask::new(MergeEngine::new(
            fs.clone(),
            CacheLayout::new("/work/app/.CACHE"),
        ));
        let logs = LogBuffer::new();

        task.run(&request(), &context(), &logs.sink()).await.unwrap();

        assert_eq!(task.queue().len(), 1);
        assert_eq!(task.last_report().unwrap().copied_files, 1);
        assert_eq!(logs.drain().info.len(), 1);
    }

    struct Failing;

    #[async_trait]
    impl PreBuildTasks for Failing {
        async fn run(&self, _: &PreBuildRequest, _: &BuildContext, _: &LogSink) -> Result<()> {
            bail!("task rejected")
        }
    }

    #[tokio::test]
    async fn test_task_set_propagates_failure() {
        let set = TaskSet::new()
            .with_task(Box::new(NoPreBuildTasks))
            .with_task(Box::new(Failing));

        let err = set
            .run(&request(), &context(), &LogBuffer::new().sink())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("task rejected"));
        assert_eq!(set.len(), 2);
    }
}
