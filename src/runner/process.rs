//! Process runner implementation
//!
//! Spawns one child per invocation in a fresh scratch directory and races it
//! against a wall-clock deadline. Runs with the host's privileges; this is a
//! resource bound, not a sandbox.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::fs;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::capture::OutputCapture;
use super::{CommandSpec, RunError, RunOutcome, SENTINEL_EXIT_CODE};
use crate::languages::LanguageTable;

/// Default wall-clock deadline for one run
pub const DEFAULT_DEADLINE_MS: u64 = 3000;

/// Default cap for each captured stream
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1024 * 1024;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Wall-clock deadline for the whole command (compile + run)
    pub deadline: Duration,
    /// Maximum bytes kept per stream
    pub output_limit_bytes: usize,
    /// Parent directory for per-invocation scratch directories
    pub scratch_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

/// Runs caller-supplied source code under a deadline
pub struct ProcessRunner {
    languages: LanguageTable,
    config: RunnerConfig,
}

impl ProcessRunner {
    pub fn new(languages: LanguageTable, config: RunnerConfig) -> Self {
        Self { languages, config }
    }

    /// Run `source` as a program in `language`.
    ///
    /// The scratch directory holds the source and any compiled binary; it is
    /// removed when this call returns, on every path.
    pub async fn run(&self, language: &str, source: &str) -> Result<RunOutcome, RunError> {
        let lang_config = self
            .languages
            .get(language)
            .ok_or_else(|| RunError::UnsupportedLanguage(language.to_string()))?;

        let workspace = tempfile::Builder::new()
            .prefix("codementor-run-")
            .tempdir_in(&self.config.scratch_dir)
            .map_err(RunError::Workspace)?;

        let source_path = workspace.path().join(&lang_config.source_file);
        fs::write(&source_path, source)
            .await
            .map_err(RunError::Workspace)?;

        let cmd = lang_config.command(workspace.path());
        debug!(
            "Running {} program in {:?} (compiled: {})",
            lang_config.name,
            workspace.path(),
            lang_config.is_compiled()
        );
        let outcome = self.execute(&cmd).await;

        drop(workspace);
        outcome
    }

    /// Execute a command, killing its process group if the deadline fires.
    ///
    /// The group is also killed after a normal exit, so background
    /// descendants never outlive the call. Dropping the returned future kills
    /// the group as well.
    pub async fn execute(&self, cmd: &CommandSpec) -> Result<RunOutcome, RunError> {
        let mut child = spawn(cmd)?;
        let mut group = ProcessGroup::of(&child);
        let limit = self.config.output_limit_bytes;

        let mut stdout = match child.stdout.take() {
            Some(pipe) => OutputCapture::spawn(pipe, limit),
            None => OutputCapture::spawn(tokio::io::empty(), limit),
        };
        let mut stderr = match child.stderr.take() {
            Some(pipe) => OutputCapture::spawn(pipe, limit),
            None => OutputCapture::spawn(tokio::io::empty(), limit),
        };

        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.deadline;

        match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => {
                let status = status.map_err(RunError::Wait)?;
                group.kill();

                // Every writer in the group is dead; a descendant that left
                // the group can still hold a pipe, so EOF is bounded too.
                let drained = tokio::time::timeout_at(deadline, async {
                    stdout.closed().await;
                    stderr.closed().await;
                })
                .await;
                if drained.is_err() {
                    warn!("Output of {} still open after exit, truncating", cmd.program);
                }

                let exit_code = status.code().unwrap_or(SENTINEL_EXIT_CODE);
                info!(
                    "Process {} finished: exit_code={}, elapsed_ms={}",
                    cmd.program,
                    exit_code,
                    started.elapsed().as_millis()
                );
                Ok(RunOutcome {
                    stdout: stdout.into_bytes(),
                    stderr: stderr.into_bytes(),
                    exit_code,
                    timed_out: false,
                })
            }
            Err(_) => {
                warn!(
                    "Process {} exceeded deadline of {}ms, killing process group",
                    cmd.program,
                    self.config.deadline.as_millis()
                );
                group.kill();
                if let Err(e) = child.start_kill() {
                    debug!("start_kill failed: {}", e);
                }
                if let Err(e) = child.wait().await {
                    warn!("Failed to reap killed process: {}", e);
                }
                Ok(RunOutcome {
                    stdout: stdout.into_bytes(),
                    stderr: stderr.into_bytes(),
                    exit_code: SENTINEL_EXIT_CODE,
                    timed_out: true,
                })
            }
        }
    }
}

fn spawn(cmd: &CommandSpec) -> Result<Child, RunError> {
    if cmd.program.is_empty() {
        return Err(RunError::Spawn {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        });
    }

    debug!("Spawning {:?} with args {:?}", cmd.program, cmd.args);

    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);
    if let Some(dir) = &cmd.work_dir {
        command.current_dir(dir);
    }

    command.spawn().map_err(|source| RunError::Spawn {
        program: cmd.program.clone(),
        source,
    })
}

/// The child's process group, killed once explicitly or on drop.
///
/// The child leads its own group (`process_group(0)`), so its pid is the
/// pgid. The id is taken at spawn time; `Child::id` is gone once the child
/// has been reaped.
struct ProcessGroup {
    pgid: Option<Pid>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self {
            pgid: child.id().map(|pid| Pid::from_raw(pid as i32)),
        }
    }

    /// SIGKILL every process still in the group. Later calls do nothing.
    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            match killpg(pgid, Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => debug!("killpg({}) failed: {}", pgid, e),
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}
