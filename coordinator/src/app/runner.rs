//! Out-of-process administrative commands with a hard deadline.
//!
//! Every invocation owns its child exclusively. On every exit path the child
//! has either exited on its own or been killed and reaped before we return.

use core::fmt;
use core::future::Future;
use core::time::Duration;
use std::io;
use std::process::{ExitStatus, Stdio};

use secrecy::{ExposeSecret as _, SecretString};
use tokio::io::{AsyncRead, AsyncReadExt as _};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use thiserror::Error as ThisError;
use tracing::{debug, warn};

/// Shown in place of the secret wherever a command line is logged.
const REDACTED: &str = "***";

/// A shell command line that may embed a credential.
///
/// The real line is only exposed to the shell; [`fmt::Display`] shows the redacted form.
#[derive(Debug, Clone)]
pub struct CommandLine {
    line: SecretString,
    shown: String,
}

impl CommandLine {
    /// Wraps a command line that carries no secret.
    #[must_use]
    pub fn plain(line: impl Into<String>) -> Self {
        let line = line.into();
        Self {
            shown: line.clone(),
            line: SecretString::from(line),
        }
    }

    /// Substitutes `{ip}`, `{user}` and `{secret}` in `template`.
    ///
    /// `{user}` and `{secret}` are quoted for the platform shell, so each becomes
    /// exactly one word whatever it contains, and an empty secret still passes an
    /// explicit empty argument. `{ip}` is inserted verbatim and must already be a
    /// validated address.
    #[must_use]
    pub fn render(template: &str, ip: &str, user: &str, secret: &SecretString) -> Self {
        let user = quote(user);
        let fill = |secret: &str| {
            template
                .replace("{ip}", ip)
                .replace("{user}", &user)
                .replace("{secret}", &quote(secret))
        };
        Self {
            line: SecretString::from(fill(secret.expose_secret())),
            shown: fill(REDACTED),
        }
    }

    fn expose(&self) -> &str {
        self.line.expose_secret()
    }
}

/// Single-quotes `value` for `sh`, closing and reopening around embedded quotes.
#[cfg(not(windows))]
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Double-quotes `value` for `cmd`. Quotes are doubled and `%` is escaped
/// outside the quoted run so it is never expanded as a variable.
#[cfg(windows)]
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\"").replace('%', "\"^%\""))
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shown)
    }
}

/// Result of a bounded command run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// Non-zero exit, or the command could not be started at all.
    Failure,
    /// Still running at the deadline; it was killed.
    TimedOut,
}

/// Runs administrative commands. Never fails; every problem maps to an outcome.
pub trait CommandRunner: Send + Sync + 'static {
    fn run(
        &self,
        command: &CommandLine,
        limit: Duration,
    ) -> impl Future<Output = CommandOutcome> + Send;
}

/// Runs commands through the platform shell (`cmd /C` or `sh -c`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    async fn run(&self, command: &CommandLine, limit: Duration) -> CommandOutcome {
        match execute(command, limit).await {
            Ok(finished) if finished.status.success() => {
                debug!(%command, "Command succeeded");
                CommandOutcome::Success
            }
            Ok(finished) => {
                debug!(
                    %command,
                    status = ?finished.status,
                    stderr = %String::from_utf8_lossy(&finished.stderr).trim(),
                    "Command failed"
                );
                CommandOutcome::Failure
            }
            Err(ExecError::TimedOut) => {
                warn!(%command, ?limit, "Command timed out and was killed");
                CommandOutcome::TimedOut
            }
            Err(e) => {
                warn!(%command, "Command could not be run: {e}");
                CommandOutcome::Failure
            }
        }
    }
}

/// Runs `command` and returns its stdout if it exits successfully in time.
///
/// # Errors
///
/// Returns an error if the command can't be started, times out or exits non-zero.
pub async fn capture_output(command: &CommandLine, limit: Duration) -> eyre::Result<String> {
    let finished = execute(command, limit)
        .await
        .map_err(|e| eyre::eyre!("`{command}`: {e}"))?;
    if !finished.status.success() {
        eyre::bail!("`{command}` exited with {}", finished.status);
    }
    Ok(String::from_utf8_lossy(&finished.stdout).into_owned())
}

#[derive(Debug, ThisError)]
enum ExecError {
    #[error("failed to spawn: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to wait: {0}")]
    Wait(#[source] io::Error),
    #[error("timed out")]
    TimedOut,
}

struct Finished {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn shell(line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").raw_arg(line);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        // Own process group, so a timeout takes down everything the line started.
        cmd.arg("-c").arg(line).process_group(0);
        cmd
    }
}

async fn execute(command: &CommandLine, limit: Duration) -> Result<Finished, ExecError> {
    let mut child = shell(command.expose())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(ExecError::Spawn)?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    let waited = timeout(limit, async {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let (status, (), ()) = tokio::join!(
            child.wait(),
            drain(stdout.as_mut(), &mut out),
            drain(stderr.as_mut(), &mut err),
        );
        status.map(|status| Finished {
            status,
            stdout: out,
            stderr: err,
        })
    })
    .await;

    match waited {
        Ok(Ok(finished)) => Ok(finished),
        Ok(Err(e)) => {
            terminate(&mut child).await;
            Err(ExecError::Wait(e))
        }
        Err(_) => {
            terminate(&mut child).await;
            Err(ExecError::TimedOut)
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<&mut R>, buf: &mut Vec<u8>) {
    if let Some(pipe) = pipe {
        if let Err(e) = pipe.read_to_end(buf).await {
            debug!("Failed to read child output: {e}");
        }
    }
}

/// Kills the child and everything in its process group, then reaps the child.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pgid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        use nix::{sys::signal, unistd::Pid};
        if let Err(e) = signal::killpg(Pid::from_raw(pgid), signal::Signal::SIGKILL) {
            debug!("Failed to kill process group {pgid}: {e}");
        }
    }
    if let Err(e) = child.kill().await {
        warn!("Failed to kill command: {e}");
    }
}
