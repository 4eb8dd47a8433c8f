//! The process-invocation primitive shared by every CLI adapter.

use camino::Utf8Path;
use std::collections::BTreeMap;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Error type for scheduler command invocation.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The process could not be spawned at all.
    #[error("failed to execute {command}: {error}")]
    Execution { command: String, error: String },
    /// The process ran and exited non-zero; `stderr` is captured verbatim.
    #[error("command {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// Run `command` with `args`, merging `env` over the inherited environment
/// and writing `stdin` to the child before reading its output.
///
/// Returns captured stdout on a zero exit. A non-zero exit fails with the
/// child's stderr carried verbatim. No retry happens at this layer; the
/// call resolves only once the child has exited.
pub async fn invoke(
    command: &str,
    args: &[String],
    env: &BTreeMap<String, String>,
    stdin: &str,
) -> Result<String, CommandError> {
    invoke_in(None, command, args, env, stdin).await
}

/// [`invoke`], run from `dir` when one is given. Some submission tools
/// take the job's working directory from the directory they are invoked
/// in rather than from a flag.
pub async fn invoke_in(
    dir: Option<&Utf8Path>,
    command: &str,
    args: &[String],
    env: &BTreeMap<String, String>,
    stdin: &str,
) -> Result<String, CommandError> {
    tracing::debug!(command, ?args, "invoking scheduler command");

    let mut cmd = Command::new(command);
    cmd.args(args)
        .envs(env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|e| CommandError::Execution {
        command: command.to_string(),
        error: e.to_string(),
    })?;

    if let Some(mut handle) = child.stdin.take() {
        handle
            .write_all(stdin.as_bytes())
            .await
            .map_err(|e| CommandError::Execution {
                command: command.to_string(),
                error: e.to_string(),
            })?;
        // closing the handle signals EOF to the child
        drop(handle);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| CommandError::Execution {
            command: command.to_string(),
            error: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            command: command.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Resolve `cmd` against an optional install directory and a per-command
/// override map. Overrides win; otherwise the command is joined onto the
/// install directory when one is configured.
pub fn bin_path(
    cmd: &str,
    bin: Option<&Utf8Path>,
    bin_overrides: &BTreeMap<String, String>,
) -> String {
    if let Some(replacement) = bin_overrides.get(cmd) {
        replacement.clone()
    } else if let Some(bin) = bin {
        bin.join(cmd).into_string()
    } else {
        cmd.to_string()
    }
}

/// Rewrite an invocation to run on `submit_host` over ssh.
///
/// With `strict_host_checking` disabled the known-hosts checks are turned
/// off, matching how clusters front their login nodes with rotating
/// hostkeys. An empty host leaves the invocation untouched.
pub fn ssh_wrap(
    submit_host: &str,
    strict_host_checking: bool,
    command: String,
    args: Vec<String>,
) -> (String, Vec<String>) {
    if submit_host.is_empty() {
        return (command, args);
    }

    let mut ssh_args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
    if !strict_host_checking {
        ssh_args.push("-o".to_string());
        ssh_args.push("UserKnownHostsFile=/dev/null".to_string());
        ssh_args.push("-o".to_string());
        ssh_args.push("StrictHostKeyChecking=no".to_string());
    }
    ssh_args.push(submit_host.to_string());
    ssh_args.push(command);
    ssh_args.extend(args);

    ("ssh".to_string(), ssh_args)
}
