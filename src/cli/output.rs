//! Output formatting for command results

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::merge::{MergeQueue, MergeReport};
use crate::pipeline::BuildSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// Human-readable formatted text
    Human,
}

#[derive(Serialize)]
struct MergeOutput<'a> {
    project: &'a Path,
    report: &'a MergeReport,
    queue: &'a MergeQueue,
}

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_merge(
        &self,
        project: &Path,
        report: &MergeReport,
        queue: &MergeQueue,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&MergeOutput {
                project,
                report,
                queue,
            })
            .context("Failed to serialize merge report to JSON"),
            OutputFormat::Human => Ok(self.format_merge_human(project, report, queue)),
        }
    }

    fn format_merge_human(
        &self,
        project: &Path,
        report: &MergeReport,
        queue: &MergeQueue,
    ) -> String {
        let mut output = String::new();

        if report.collisions.is_empty() {
            output.push_str("\u{2713} Merge Complete\n");
        } else {
            output.push_str("\u{26A0} Merge Complete (With Collisions)\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Project:  {}\n\n", project.display()));
        output.push_str("Files:\n");
        output.push_str(&format!(
            "\u{251C}\u{2500} Staged entries: {}\n",
            report.staged_entries
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Copied:         {}\n",
            report.copied_files
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Queued:         {}\n",
            report.queued_files
        ));
        output.push_str(&format!(
            "\u{2514}\u{2500} Ignored:        {}\n",
            report.ignored_files
        ));

        if !queue.is_empty() {
            output.push_str("\nQueued for combination:\n");
            for entry in queue.iter() {
                output.push_str(&format!("  \u{2022} [{}] {}\n", entry.role, entry.path.display()));
            }
        }

        if !report.collisions.is_empty() {
            output.push_str("\nCollisions:\n");
            for collision in &report.collisions {
                output.push_str(&format!(
                    "  \u{2022} {} kept {}, dropped {}\n",
                    collision.destination.display(),
                    collision.kept.display(),
                    collision.dropped.display()
                ));
            }
        }

        output
    }

    pub fn format_build(&self, summary: &BuildSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::json!({
                "platform": summary.platform,
                "cycles": summary.cycles,
                "webview_routes": summary.webview_routes,
            })
            .to_string()),
            OutputFormat::Human => {
                let mut output = format!(
                    "\u{2713} Built {} ({} cycle{})\n",
                    summary.platform,
                    summary.cycles,
                    if summary.cycles == 1 { "" } else { "s" }
                );
                if !summary.webview_routes.is_empty() {
                    output.push_str("Webview pages:\n");
                    for route in &summary.webview_routes {
                        output.push_str(&format!("  \u{2022} {}\n", route.display()));
                    }
                }
                Ok(output)
            }
        }
    }
}
