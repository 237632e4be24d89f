//! Helpers for running child processes with timeouts and bounded output.

use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How long pipe threads get to report after the process group is killed.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

/// Run a command with a timeout, feeding `stdin` and capturing stdout/stderr
/// without risking pipe deadlocks.
///
/// The child runs in its own process group. Input is written and output is
/// read on separate threads while it runs, then stdin is closed to signal end
/// of input. `output_limit_bytes` bounds the amount of stdout/stderr stored in
/// memory (bytes beyond this are discarded while still draining the pipe).
///
/// `timeout` bounds the whole call. If the child is still running at the
/// deadline, its process group is killed and the result carries `timed_out`
/// with no captured output. If the child exits in time but descendants keep
/// its pipes open, they are killed at the deadline and whatever they had
/// written so far is returned.
#[instrument(skip_all, fields(timeout_ms = timeout.as_millis() as u64, output_limit_bytes, stdin_bytes = stdin.len()))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    stdin: Vec<u8>,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    debug!("spawning child process");
    let deadline = Instant::now() + timeout;
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };
    let pid = child.id();

    let child_stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin was not piped"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (tx, rx) = mpsc::channel();
    spawn_pipe_thread(&tx, move || PipeEvent::Stdin(write_stdin(child_stdin, &stdin)));
    spawn_pipe_thread(&tx, move || {
        PipeEvent::Stdout(read_stream_limited(stdout, output_limit_bytes))
    });
    spawn_pipe_thread(&tx, move || {
        PipeEvent::Stderr(read_stream_limited(stderr, output_limit_bytes))
    });
    drop(tx);

    let mut pipes = PipeResults::default();
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(timeout_ms = timeout.as_millis() as u64, "command timed out, killing");
            let status = kill_and_reap(&mut child, pid)?;
            // Threads still blocked after the grace period belong to pipes
            // held by processes that left the group; they are left detached.
            if !pipes.collect(&rx, Instant::now() + KILL_GRACE) {
                warn!("pipes still open after kill");
            }
            debug!(exit_code = ?status.code(), "command killed after timeout");
            return Ok(CommandOutput {
                status,
                stdout: Vec::new(),
                stderr: Vec::new(),
                stdout_truncated: 0,
                stderr_truncated: 0,
                timed_out: true,
            });
        }
    };

    if !pipes.collect(&rx, deadline) {
        warn!("descendants held pipes past the deadline, killing process group");
        kill_process_group(pid)?;
        pipes.collect(&rx, Instant::now() + KILL_GRACE);
    }

    match pipes.stdin.take() {
        Some(result) => result.context("write stdin")?,
        None => debug!("stdin writer did not finish"),
    }
    let (stdout, stdout_truncated) = pipes
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout reader did not finish"))?
        .context("read stdout")?;
    let (stderr, stderr_truncated) = pipes
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr reader did not finish"))?
        .context("read stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out: false,
    })
}

enum PipeEvent {
    Stdin(Result<()>),
    Stdout(Result<(Vec<u8>, usize)>),
    Stderr(Result<(Vec<u8>, usize)>),
}

#[derive(Default)]
struct PipeResults {
    stdin: Option<Result<()>>,
    stdout: Option<Result<(Vec<u8>, usize)>>,
    stderr: Option<Result<(Vec<u8>, usize)>>,
}

impl PipeResults {
    fn is_complete(&self) -> bool {
        self.stdin.is_some() && self.stdout.is_some() && self.stderr.is_some()
    }

    /// Receive pipe events until all three have reported or `until` passes.
    /// Returns whether every pipe reported.
    fn collect(&mut self, rx: &Receiver<PipeEvent>, until: Instant) -> bool {
        while !self.is_complete() {
            let wait = until.saturating_duration_since(Instant::now());
            match rx.recv_timeout(wait) {
                Ok(PipeEvent::Stdin(result)) => self.stdin = Some(result),
                Ok(PipeEvent::Stdout(result)) => self.stdout = Some(result),
                Ok(PipeEvent::Stderr(result)) => self.stderr = Some(result),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    error!("pipe thread exited without reporting");
                    return false;
                }
            }
        }
        true
    }
}

fn spawn_pipe_thread<F>(tx: &Sender<PipeEvent>, work: F)
where
    F: FnOnce() -> PipeEvent + Send + 'static,
{
    let tx = tx.clone();
    thread::spawn(move || {
        // The receiver is gone once the caller stopped waiting.
        let _ = tx.send(work());
    });
}

fn kill_and_reap(child: &mut Child, pid: u32) -> Result<ExitStatus> {
    kill_process_group(pid)?;
    child.kill().context("kill command")?;
    child.wait().context("wait command after kill")
}

/// SIGKILL every process in the group led by `pgid`. A group that is already
/// gone is not an error.
#[cfg(unix)]
fn kill_process_group(pgid: u32) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(pgid).context("process group id out of range")?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e).context("kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) -> Result<()> {
    Ok(())
}

/// Write all of `input` and drop the pipe to close it.
///
/// A child that exits without reading its input closes the pipe first; that
/// broken pipe is not an error.
fn write_stdin<W: Write>(mut writer: W, input: &[u8]) -> Result<()> {
    match writer.write_all(input).and_then(|()| writer.flush()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            debug!("child closed stdin before reading all input");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("read output"),
        };
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
