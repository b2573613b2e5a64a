//! Blocking subprocess invocation with a deadline.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::backend::OcrError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit status and captured stderr of a finished tool.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stderr: String,
}

impl ToolOutput {
    /// Convert a non-zero exit into `OcrError::OcrFailed`.
    pub fn check(self, tool: &str) -> Result<Self, OcrError> {
        if self.status.success() {
            Ok(self)
        } else {
            Err(OcrError::OcrFailed(format!(
                "{} exited with {}: {}",
                tool,
                self.status,
                self.stderr.trim()
            )))
        }
    }
}

/// Run `cmd` to completion, killing it once `timeout` elapses.
///
/// Stdout is discarded; every tool used here writes its results to files.
pub fn run_tool(cmd: &mut Command, tool: &str, timeout: Duration) -> Result<ToolOutput, OcrError> {
    debug!("Running {}: {:?}", tool, cmd);

    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OcrError::BackendNotAvailable(format!("{} not found", tool)));
        }
        Err(e) => return Err(OcrError::Io(e)),
    };

    // Drain stderr on a side thread so a chatty tool can't fill the pipe and stall.
    let stderr = child.stderr.take();
    let reader = thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut buf);
        }
        buf
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            let _ = reader.join();
            return Err(OcrError::Timeout {
                tool: tool.to_string(),
                secs: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stderr = reader.join().unwrap_or_default();
    Ok(ToolOutput { status, stderr })
}

/// Append `.ext` to a path without touching any dots already in its file name.
pub fn with_appended_extension(prefix: &Path, ext: &str) -> PathBuf {
    let mut name: OsString = prefix.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Read a tool's text output file and remove it.
///
/// A missing file means the tool produced nothing usable.
pub fn take_output_file(path: &Path) -> Result<String, OcrError> {
    let text = match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OcrError::OcrFailed(format!(
                "no output written to {}",
                path.display()
            )));
        }
        Err(e) => return Err(OcrError::Io(e)),
    };
    let _ = std::fs::remove_file(path);
    Ok(text)
}
