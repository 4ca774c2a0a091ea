//! External program execution
//!
//! Provides a trait for running the package manager so the install
//! processes can be exercised without a real `npm` on the PATH.

use crate::error::{NpmError, NpmResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A single invocation of the external program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// Arguments after the program name
    pub args: Vec<String>,

    /// Working directory
    pub dir: PathBuf,

    /// Variables set on top of the inherited process environment
    pub env: Vec<(String, String)>,
}

impl Execution {
    pub fn new<I, S>(args: I, dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            dir: dir.into(),
            env: Vec::new(),
        }
    }

    /// Add environment overrides
    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Arguments joined for display
    pub fn display_args(&self) -> String {
        self.args.join(" ")
    }
}

/// Captured result of an execution that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    /// A successful execution with the given stdout
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed execution with the given exit code and stderr
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Abstract external program interface
///
/// Returns `Ok` whenever the program could be started; a non-zero exit
/// is reported through `ExecOutput::code`.
#[async_trait]
pub trait Executable: Send + Sync {
    async fn execute(&self, execution: &Execution) -> NpmResult<ExecOutput>;
}

/// Runs a named program found on the PATH
pub struct SystemExecutable {
    program: String,
}

impl SystemExecutable {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The `npm` executable
    pub fn npm() -> Self {
        Self::new("npm")
    }
}

#[async_trait]
impl Executable for SystemExecutable {
    async fn execute(&self, execution: &Execution) -> NpmResult<ExecOutput> {
        debug!("Executing: {} {:?}", self.program, execution.args);

        let output = Command::new(&self.program)
            .args(&execution.args)
            .current_dir(&execution.dir)
            .envs(execution.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                NpmError::command_failed(
                    format!("{} {}", self.program, execution.display_args()),
                    e,
                )
            })?;

        Ok(ExecOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn combined_output() {
        let output = ExecOutput {
            code: Some(1),
            stdout: "out\n".to_string(),
            stderr: "err".to_string(),
        };
        assert_eq!(output.combined(), "out\nerr");
        assert_eq!(ExecOutput::failure(1, "only err").combined(), "only err");
        assert!(!output.is_success());
    }

    #[tokio::test]
    async fn system_executable_runs_program() {
        let dir = TempDir::new().unwrap();
        let executable = SystemExecutable::new("sh");
        let execution = Execution::new(["-c", "echo $GREETING; pwd"], dir.path())
            .with_env(vec![("GREETING".to_string(), "hello".to_string())]);

        let output = executable.execute(&execution).await.unwrap();

        assert!(output.is_success());
        assert!(output.stdout.starts_with("hello\n"));
    }

    #[tokio::test]
    async fn system_executable_reports_exit_code() {
        let dir = TempDir::new().unwrap();
        let executable = SystemExecutable::new("sh");
        let output = executable
            .execute(&Execution::new(["-c", "exit 3"], dir.path()))
            .await
            .unwrap();
        assert_eq!(output.code, Some(3));
    }

    #[tokio::test]
    async fn missing_program_is_command_failed() {
        let dir = TempDir::new().unwrap();
        let executable = SystemExecutable::new("definitely-not-a-real-program-xyz");
        let err = executable
            .execute(&Execution::new(["--version"], dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, NpmError::CommandFailed { .. }));
    }
}
