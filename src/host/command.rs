// Privileged host command execution (chroot into the host root, C locale, deadline).

use crate::error::{SourceError, SourceResult};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

const HOST_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl HostCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for a in &self.args {
            write!(f, " {}", a)?;
        }
        Ok(())
    }
}

/// Runs host tools. Implemented by [`HostCommandRunner`] and by fakes in tests.
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` and return its stdout, or the reason it failed.
    fn try_run(&self, cmd: &HostCommand) -> impl Future<Output = SourceResult<String>> + Send;

    /// Like [`CommandRunner::try_run`], but every failure degrades to empty output.
    fn run(&self, cmd: &HostCommand) -> impl Future<Output = String> + Send {
        async move {
            match self.try_run(cmd).await {
                Ok(out) => out,
                Err(e) => {
                    warn!(error = %e, command = %cmd, operation = "run_host_command", "host command failed");
                    String::new()
                }
            }
        }
    }
}

pub struct HostCommandRunner {
    root: PathBuf,
    timeout: Duration,
    max_output_bytes: usize,
}

impl HostCommandRunner {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            root: root.into(),
            timeout,
            max_output_bytes,
        }
    }

    fn build(&self, cmd: &HostCommand) -> Command {
        let mut command = if self.root == Path::new("/") {
            Command::new(&cmd.program)
        } else {
            let mut c = Command::new("chroot");
            c.arg(&self.root).arg(&cmd.program);
            c
        };
        command
            .args(&cmd.args)
            .env_clear()
            .env("PATH", HOST_PATH)
            .env("LC_ALL", "C")
            .env("LANG", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl CommandRunner for HostCommandRunner {
    async fn try_run(&self, cmd: &HostCommand) -> SourceResult<String> {
        let mut command = self.build(cmd);
        let limit = self.max_output_bytes;

        let run = async {
            let mut child = command.spawn()?;
            let mut buf = Vec::new();
            if let Some(stdout) = child.stdout.take() {
                stdout.take(limit as u64 + 1).read_to_end(&mut buf).await?;
            }
            let truncated = buf.len() > limit;
            if truncated {
                buf.truncate(limit);
                let _ = child.start_kill();
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, buf, truncated))
        };

        let (status, buf, truncated) = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => return Err(SourceError::tool(&cmd.program, e)),
            Err(_) => {
                return Err(SourceError::tool(
                    &cmd.program,
                    format!("timed out after {:?}", self.timeout),
                ));
            }
        };

        if truncated {
            warn!(command = %cmd, limit, "host command output truncated");
        } else if !status.success() {
            return Err(SourceError::tool(&cmd.program, format!("exited with {}", status)));
        }
        debug!(command = %cmd, bytes = buf.len(), "host command finished");
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
