use super::{
    CompileOutcome, CompileStats, Compiler, CompilerConfig, CompilerFactory, H5CompilerConfig,
};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Environment variable carrying the JSON compiler configuration
pub const CONFIG_ENV: &str = "MINAPACK_COMPILER_CONFIG";

/// Set to `1` when the compiler should keep rebuilding
pub const WATCH_ENV: &str = "MINAPACK_WATCH";

/// Runs an external bundler. The bundler prints one JSON stats document
/// per build cycle on stdout.
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    config_json: String,
    working_dir: PathBuf,
}

impl CommandCompiler {
    fn command(&self, watch: bool) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .env(CONFIG_ENV, &self.config_json)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if watch {
            command.env(WATCH_ENV, "1");
        }
        command
    }
}

fn parse_stats(line: &str) -> Result<CompileStats> {
    serde_json::from_str(line.trim()).context("Compiler printed invalid stats")
}

#[async_trait]
impl Compiler for CommandCompiler {
    async fn run(&mut self) -> CompileOutcome {
        debug!(program = %self.program, "Running compiler");
        let output = match self.command(false).output().await {
            Ok(output) => output,
            Err(e) => {
                return CompileOutcome::failure(
                    anyhow!(e).context(format!("Failed to start compiler {}", self.program)),
                )
            }
        };

        if !output.status.success() {
            return CompileOutcome::failure(anyhow!(
                "Compiler {} exited with {}",
                self.program,
                output.status
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().rev().find(|line| !line.trim().is_empty()) {
            Some(line) => match parse_stats(line) {
                Ok(stats) => CompileOutcome::success(stats),
                Err(e) => CompileOutcome::failure(e),
            },
            None => CompileOutcome::failure(anyhow!(
                "Compiler {} printed no stats",
                self.program
            )),
        }
    }

    async fn watch(&mut self) -> Result<mpsc::UnboundedReceiver<CompileOutcome>> {
        let mut child = self
            .command(true)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start compiler {}", self.program))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Compiler stdout was not captured"))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let program = self.program.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => {
                        let outcome = match parse_stats(&line) {
                            Ok(stats) => CompileOutcome::success(stats),
                            Err(e) => CompileOutcome::failure(e),
                        };
                        if tx.send(outcome).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(program = %program, error = %e, "Lost compiler output");
                        break;
                    }
                }
            }
            match child.wait().await {
                Ok(status) => debug!(program = %program, %status, "Compiler exited"),
                Err(e) => warn!(program = %program, error = %e, "Failed to reap compiler"),
            }
        });

        Ok(rx)
    }
}

/// Builds [`CommandCompiler`]s from a command line such as `node build.js`
#[derive(Debug, Clone)]
pub struct CommandCompilerFactory {
    program: String,
    args: Vec<String>,
}

impl CommandCompilerFactory {
    pub fn new(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            bail!("Compiler command is empty");
        };
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn compiler<C: Serialize>(
        &self,
        config: &C,
        env: &BTreeMap<String, String>,
        working_dir: PathBuf,
    ) -> Result<Box<dyn Compiler>> {
        let config_json =
            serde_json::to_string(config).context("Failed to serialize compiler config")?;
        Ok(Box::new(CommandCompiler {
            program: self.program.clone(),
            args: self.args.clone(),
            env: env.clone(),
            config_json,
            working_dir,
        }))
    }
}

impl CompilerFactory for CommandCompilerFactory {
    fn create(&self, config: &CompilerConfig) -> Result<Box<dyn Compiler>> {
        self.compiler(config, &config.env, config.project_dir.clone())
    }

    fn create_h5(&self, config: &H5CompilerConfig) -> Result<Box<dyn Compiler>> {
        self.compiler(config, &config.env, config.project_dir.clone())
    }
}
