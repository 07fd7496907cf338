//! Execution of individual stage actions.
//!
//! Commands run through `/bin/sh -c` with the inherited environment plus the
//! target's toolchain variables. The child gets its own process group so a
//! cancelled build also takes down `make` and the compilers it spawned.
//! Both output streams are piped and logged line by line at debug level;
//! only the stderr tail is kept for the failure report.

use std::collections::{BTreeMap, VecDeque};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::types::{StageAction, StageError};

/// Lines of stderr kept in a failure report.
const STDERR_TAIL_LINES: usize = 40;

/// Everything an action needs besides its own definition.
#[derive(Debug, Clone)]
pub struct ActionContext {
  /// Toolchain variables exported to every command.
  pub env: BTreeMap<String, String>,
  /// Working directory when an action names none.
  pub default_cwd: PathBuf,
  /// Scratch directory exported as TMPDIR.
  pub tmp_dir: PathBuf,
  /// PATH override for spawned commands.
  pub search_path: Option<OsString>,
}

/// Run one action to completion, or until `cancel` fires.
pub async fn execute_action(
  action: &StageAction,
  ctx: &ActionContext,
  cancel: &CancellationToken,
) -> Result<(), StageError> {
  match action {
    StageAction::Cmd { cmd, env, cwd } => execute_cmd(cmd, env, cwd.as_deref(), ctx, cancel).await,
    StageAction::CopyTree { from, to } => {
      let (from, to) = (from.clone(), to.clone());
      let copy = tokio::task::spawn_blocking(move || copy_tree(&from, &to));
      tokio::select! {
        res = copy => res.map_err(io::Error::other)?.map_err(StageError::Io),
        _ = cancel.cancelled() => Err(StageError::Cancelled),
      }
    }
  }
}

async fn execute_cmd(
  cmd: &str,
  env: &BTreeMap<String, String>,
  cwd: Option<&Path>,
  ctx: &ActionContext,
  cancel: &CancellationToken,
) -> Result<(), StageError> {
  info!(cmd = %cmd, "executing command");

  tokio::fs::create_dir_all(&ctx.tmp_dir).await?;
  let working_dir = cwd.unwrap_or(&ctx.default_cwd);

  let mut command = Command::new("/bin/sh");
  command
    .arg("-c")
    .arg(cmd)
    .current_dir(working_dir)
    .env("TMPDIR", &ctx.tmp_dir)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  if let Some(path) = &ctx.search_path {
    command.env("PATH", path);
  }
  command.envs(&ctx.env);
  command.envs(env);

  #[cfg(unix)]
  command.process_group(0);

  debug!(working_dir = ?working_dir, "spawning process");

  let mut child = command.spawn()?;
  let pid = child.id();

  let stdout = child.stdout.take().map(|out| tokio::spawn(forward_lines(out, "stdout", 0)));
  let stderr = child
    .stderr
    .take()
    .map(|err| tokio::spawn(forward_lines(err, "stderr", STDERR_TAIL_LINES)));

  let status = tokio::select! {
    status = child.wait() => status?,
    _ = cancel.cancelled() => {
      kill_group(pid);
      return Err(StageError::Cancelled);
    }
  };

  if let Some(handle) = stdout {
    handle.await.map_err(io::Error::other)??;
  }
  let stderr_tail = match stderr {
    Some(handle) => handle.await.map_err(io::Error::other)??,
    None => VecDeque::new(),
  };

  if !status.success() {
    return Err(StageError::BuildAction {
      cmd: cmd.to_string(),
      code: status.code(),
      stderr: Vec::from(stderr_tail).join("\n"),
    });
  }

  Ok(())
}

/// Log every line of a child stream at debug level, keeping the last `keep`.
///
/// Build tools are not guaranteed to emit UTF-8, so lines are decoded lossily.
async fn forward_lines<R>(reader: R, stream: &'static str, keep: usize) -> io::Result<VecDeque<String>>
where
  R: AsyncRead + Unpin,
{
  let mut reader = BufReader::new(reader);
  let mut buf = Vec::new();
  let mut kept = VecDeque::with_capacity(keep);

  loop {
    buf.clear();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
      break;
    }
    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
    debug!(stream, "{}", line);
    if keep > 0 {
      if kept.len() == keep {
        kept.pop_front();
      }
      kept.push_back(line);
    }
  }

  Ok(kept)
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
  use rustix::process::{Pid, Signal, kill_process_group};

  if let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()).and_then(Pid::from_raw) {
    // The group may already be gone.
    let _ = kill_process_group(pid, Signal::KILL);
  }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

/// Copy `from` into `to`, creating directories as needed. Symlinks are
/// followed so the copy is self-contained.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
  if !from.is_dir() {
    return Err(io::Error::new(
      io::ErrorKind::NotFound,
      format!("source directory not found: {}", from.display()),
    ));
  }

  for entry in WalkDir::new(from).follow_links(true) {
    let entry = entry.map_err(io::Error::other)?;
    let rel = entry.path().strip_prefix(from).map_err(io::Error::other)?;
    let dest = to.join(rel);

    if entry.file_type().is_dir() {
      std::fs::create_dir_all(&dest)?;
    } else {
      if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
      }
      std::fs::copy(entry.path(), &dest)?;
    }
  }

  Ok(())
}
