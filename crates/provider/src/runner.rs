//! Command execution
//!
//! Runs resolved command text through a shell. Besides stdout and stderr
//! every command gets a third output stream on file descriptor 3, the
//! auxiliary channel ("extraout"), which is the only data the lifecycle
//! driver looks at. stdout and stderr are kept for diagnostics.

use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use shellform_common::{Action, Error, Result};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// File descriptor the child sees as its auxiliary output channel
pub const EXTRAOUT_FD: i32 = 3;

/// A single command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub action: Action,
    pub command: String,
    pub stdin: String,
    pub environment: BTreeMap<String, String>,
    pub working_directory: PathBuf,
}

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub extraout: String,
    pub stdout: String,
    pub stderr: String,
}

/// Executes lifecycle commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion. A nonzero exit is an error.
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutput>;
}

/// Runs commands as `<shell> -c <command>`
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

impl ShellRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, request: &CommandRequest) -> Result<CommandOutput> {
        let action = request.action;
        let extraout_file = tokio::task::spawn_blocking(tempfile::tempfile)
            .await
            .map_err(|e| Error::Internal(format!("Failed to create extraout file: {}", e)))??;

        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&request.command)
            .envs(&request.environment)
            .current_dir(&request.working_directory)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        attach_extraout(&mut command, &extraout_file)?;
        let mut extraout_file = tokio::fs::File::from_std(extraout_file);

        debug!(
            "Running {} command in {}",
            action,
            request.working_directory.display()
        );

        let mut child = command
            .spawn()
            .map_err(|source| Error::Spawn { action, source })?;

        // Feed stdin concurrently so a child that never reads it cannot stall us
        let stdin_writer = child.stdin.take().map(|mut stdin| {
            let input = request.stdin.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        warn!("Failed to write command stdin: {}", e);
                    }
                }
            })
        });

        let output = child.wait_with_output().await?;
        if let Some(writer) = stdin_writer {
            let _ = writer.await;
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        debug!("{} stdout: {}", action, stdout);
        debug!("{} stderr: {}", action, stderr);

        if !output.status.success() {
            return Err(Error::CommandFailed {
                action,
                code: output.status.code(),
                stderr,
            });
        }

        let mut raw = Vec::new();
        extraout_file.seek(SeekFrom::Start(0)).await?;
        extraout_file.read_to_end(&mut raw).await?;
        let extraout = String::from_utf8_lossy(&raw).to_string();
        debug!("{} extraout: {}", action, extraout);

        Ok(CommandOutput {
            extraout,
            stdout,
            stderr,
        })
    }
}

/// Make `file` appear as descriptor 3 in the child
#[cfg(unix)]
fn attach_extraout(command: &mut Command, file: &std::fs::File) -> Result<()> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    // SAFETY: only async-signal-safe calls (dup2, fcntl) run between fork and exec.
    unsafe {
        command.pre_exec(move || {
            if fd == EXTRAOUT_FD {
                fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty()))?;
            } else {
                nix::unistd::dup2(fd, EXTRAOUT_FD)?;
            }
            Ok(())
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn attach_extraout(_command: &mut Command, _file: &std::fs::File) -> Result<()> {
    Err(Error::Internal(
        "the auxiliary output channel requires a unix platform".to_string(),
    ))
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted runner for driving the lifecycle without a shell

    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    pub struct MockRunner {
        responses: Mutex<HashMap<Action, VecDeque<Result<CommandOutput>>>>,
        calls: Mutex<Vec<CommandRequest>>,
        delay: Option<Duration>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl MockRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sleep this long inside every invocation
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Queue a successful invocation of `action` writing `extraout`
        pub fn respond(&self, action: Action, extraout: &str) -> &Self {
            self.push(
                action,
                Ok(CommandOutput {
                    extraout: extraout.to_string(),
                    ..Default::default()
                }),
            )
        }

        /// Queue a failing invocation of `action`
        pub fn fail(&self, action: Action, code: i32) -> &Self {
            self.push(
                action,
                Err(Error::CommandFailed {
                    action,
                    code: Some(code),
                    stderr: "scripted failure".to_string(),
                }),
            )
        }

        fn push(&self, action: Action, response: Result<CommandOutput>) -> &Self {
            self.responses
                .lock()
                .entry(action)
                .or_default()
                .push_back(response);
            self
        }

        pub fn calls(&self) -> Vec<CommandRequest> {
            self.calls.lock().clone()
        }

        pub fn max_concurrency(&self) -> usize {
            self.max_active.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommandRunner for MockRunner {
        async fn run(&self, request: &CommandRequest) -> Result<CommandOutput> {
            self.calls.lock().push(request.clone());
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let response = self
                .responses
                .lock()
                .get_mut(&request.action)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| Ok(CommandOutput::default()));

            self.active.fetch_sub(1, Ordering::SeqCst);
            response
        }
    }
}
