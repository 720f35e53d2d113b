//! Child processes with a wall-clock limit.
//!
//! Output pipes are drained on helper threads so a chatty child can never block on a full pipe
//! while we wait for it.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::ExecError;

/// Captured output is truncated beyond this many bytes per stream.
const MAX_CAPTURE: usize = 1024 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Outcome of one child process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Killed because the wall-clock limit expired; output is empty.
    pub timed_out: bool,
}

/// Run `argv` in `cwd`, killing it once `timeout` expires.
pub fn run_with_timeout(argv: &[String], cwd: &Path, timeout: Duration) -> Result<ProcessOutput, ExecError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ExecError::EmptyCommand(String::new()));
    };
    tracing::debug!(command = %argv.join(" "), cwd = %cwd.display(), "spawning");

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait(); // reap
            tracing::debug!(program = %program, "killed after {:?}", timeout);
            // Grandchildren may still hold the pipes; leave the drain threads detached.
            return Ok(ProcessOutput {
                success: false,
                code: None,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: true,
            });
        }
        Err(source) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExecError::Wait {
                program: program.clone(),
                source,
            });
        }
    };

    Ok(ProcessOutput {
        success: status.success(),
        code: status.code(),
        stdout: collect(stdout),
        stderr: collect(stderr),
        timed_out: false,
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut captured = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let room = MAX_CAPTURE.saturating_sub(captured.len());
                    captured.extend_from_slice(&chunk[..n.min(room)]);
                }
            }
        }
        captured
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// `wait` with a deadline.
trait ChildExt {
    fn wait_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<ExitStatus>>;
}

impl ChildExt for Child {
    fn wait_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
        let start = Instant::now();
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() >= timeout {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
