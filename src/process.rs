//! Running a child process under a deadline with both output streams
//! captured.
//!
//! The child is owned by a guard that kills and reaps it when dropped, so
//! no exit path (timeout, i/o error, panic) leaves it running. Its output
//! streams are drained by reader threads through channels and collected
//! against a deadline: a grandchild that inherited the pipes and outlives
//! the child cannot hold the caller past that deadline.

use std::{
    io::{self, Read},
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use log::{debug, warn};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long output is still collected once the child is gone or killed
const DRAIN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("executable `{0}` was not found")]
    NotFound(String),
    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` did not finish within {timeout:?}")]
    TimedOut {
        program: String,
        timeout: Duration,
        stdout: String,
        stderr: String,
    },
    #[error("failed while waiting on `{program}`")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("kill of pid {} failed: {e}", self.child.id());
        }
        let _ = self.child.wait();
        self.reaped = true;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            warn!("killing unreaped child process {}", self.child.id());
            self.kill();
        }
    }
}

/// Spawns `command` with piped stdout/stderr and waits at most `timeout`.
pub fn run_bounded(command: &mut Command, timeout: Duration) -> Result<CapturedOutput, ProcessError> {
    let program = command.get_program().to_string_lossy().into_owned();
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let child = command.spawn().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ProcessError::NotFound(program.clone()),
        _ => ProcessError::Spawn { program: program.clone(), source },
    })?;
    let mut guard = ChildGuard { child, reaped: false };
    debug!("spawned `{}` as pid {}", program, guard.child.id());

    let stdout = capture(guard.child.stdout.take());
    let stderr = capture(guard.child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match guard.child.try_wait() {
            Ok(Some(status)) => {
                guard.reaped = true;
                break Some(status);
            }
            Ok(None) if Instant::now() >= deadline => {
                guard.kill();
                break None;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => return Err(ProcessError::Wait { program, source }),
        }
    };

    let drain_until = match status {
        Some(_) => deadline.max(Instant::now()) + DRAIN_GRACE,
        None => Instant::now() + DRAIN_GRACE,
    };
    let stdout = collect(stdout, drain_until);
    let stderr = collect(stderr, drain_until);
    match status {
        Some(status) => Ok(CapturedOutput { status, stdout, stderr }),
        None => Err(ProcessError::TimedOut { program, timeout, stdout, stderr }),
    }
}

/// Forwards everything read from `stream` as chunks; the channel
/// disconnects once the stream is closed by every writer.
fn capture<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<Vec<u8>> {
    let (sender, receiver) = mpsc::channel();
    if let Some(mut stream) = stream {
        thread::spawn(move || {
            let mut chunk = [0_u8; 4096];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if sender.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        debug!("reading child output failed: {e}");
                        break;
                    }
                }
            }
        });
    }
    receiver
}

/// Whatever arrives on `chunks` before it disconnects or `until` passes.
fn collect(chunks: Receiver<Vec<u8>>, until: Instant) -> String {
    let mut buffer = Vec::new();
    loop {
        match chunks.recv_timeout(until.saturating_duration_since(Instant::now())) {
            Ok(chunk) => buffer.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                warn!("child output still open after the child exited, keeping what was read");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
