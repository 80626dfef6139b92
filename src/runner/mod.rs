//! Runner module - caller-supplied code execution
//!
//! This module runs one program per invocation:
//! - `ProcessRunner`: materializes source into a scratch directory, spawns the
//!   language's command and enforces a wall-clock deadline
//! - `capture`: bounded stdout/stderr collection
//!
//! The runner module does NOT:
//! - Isolate the child (it runs with the host's privileges)
//! - Interpret program output
//! - Share any state between invocations

mod capture;
pub mod process;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Exit code reported when the deadline fired or the child died from a signal
pub const SENTINEL_EXIT_CODE: i32 = -1;

/// Command specification for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Working directory
    pub work_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        Self::new(program).with_args(iter.cloned())
    }
}

/// Outcome of running a program
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunOutcome {
    /// Captured stdout (possibly truncated, or partial on timeout)
    pub stdout: Vec<u8>,
    /// Captured stderr (possibly truncated, or partial on timeout)
    pub stderr: Vec<u8>,
    /// Exit code: 0 on success, the child's code on failure, or
    /// `SENTINEL_EXIT_CODE` when killed
    pub exit_code: i32,
    /// Whether the deadline fired and the process tree was killed
    pub timed_out: bool,
}

impl RunOutcome {
    /// Check if execution was successful (exited with code 0 before the deadline)
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Errors that abort a run before a normal outcome can be produced
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Failed to prepare run workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for child process: {0}")]
    Wait(#[source] std::io::Error),
}

// Re-exports
pub use process::{ProcessRunner, RunnerConfig};
