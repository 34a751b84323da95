use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

use super::{RunCompletion, TestRunner};
use crate::utils::binary_resolver;

/// Runs the test runner as a child process in the working directory
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    args: Vec<String>,
    workdir: PathBuf,
}

impl ProcessRunner {
    /// Build from a whitespace-separated command line, e.g. `npx playwright test`
    pub fn new(command_line: &str, workdir: &Path) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .context("Runner command line is empty")?;
        Ok(Self::with_args(program, parts.collect(), workdir))
    }

    pub fn with_args(program: impl Into<String>, args: Vec<String>, workdir: &Path) -> Self {
        Self {
            program: program.into(),
            args,
            workdir: workdir.to_path_buf(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl TestRunner for ProcessRunner {
    async fn execute(&self) -> Result<RunCompletion> {
        let program = binary_resolver::find_binary(&self.program, &self.workdir)?;
        info!("Starting runner: {} {}", program.display(), self.args.join(" "));

        let started = Instant::now();
        let output = Command::new(&program)
            .args(&self.args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", program.display()))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("[runner] {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!("[runner:err] {}", line);
        }

        Ok(RunCompletion {
            exit_code: output.status.code(),
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_split() {
        let runner = ProcessRunner::new("npx playwright test", Path::new(".")).unwrap();
        assert_eq!(runner.program(), "npx");
        assert_eq!(runner.args(), ["playwright", "test"]);
    }

    #[test]
    fn test_empty_command_line_rejected() {
        assert!(ProcessRunner::new("   ", Path::new(".")).is_err());
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new("./no-such-runner", dir.path()).unwrap();
        assert!(runner.execute().await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_workdir_and_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::with_args(
            "sh",
            vec![
                "-c".to_string(),
                "echo '{\"suites\":[]}' > test-results.json; exit 3".to_string(),
            ],
            dir.path(),
        );

        let done = runner.execute().await.unwrap();
        assert_eq!(done.exit_code, Some(3));
        assert!(dir.path().join("test-results.json").exists());
    }
}
