//! Child-process plumbing shared by credential checks and engine runs

use std::io::Read;
use std::process::{Child, ExitStatus};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Background readers for a child's piped stdout/stderr.
///
/// Draining on dedicated threads keeps the pipes from filling up while
/// the parent waits on the child, which would otherwise deadlock long
/// engine runs.
pub(crate) struct Drain {
    stdout: Option<JoinHandle<String>>,
    stderr: Option<JoinHandle<String>>,
}

impl Drain {
    /// Take the child's piped streams and start draining them
    pub(crate) fn start(child: &mut Child) -> Self {
        Self {
            stdout: child.stdout.take().map(|s| thread::spawn(|| read_all(s))),
            stderr: child.stderr.take().map(|s| thread::spawn(|| read_all(s))),
        }
    }

    /// Wait for both streams to close and return (stdout, stderr)
    pub(crate) fn join(self) -> (String, String) {
        let stdout = self
            .stdout
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let stderr = self
            .stderr
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        (stdout, stderr)
    }
}

fn read_all(mut stream: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = stream.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Wait for a child, optionally bounded by a deadline.
///
/// Returns `Ok(None)` when the limit expires with the child still
/// running; the caller decides whether to kill it.
pub(crate) fn wait_limited(
    child: &mut Child,
    limit: Option<Duration>,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(limit) = limit else {
        return child.wait().map(Some);
    };

    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn drain_captures_both_streams() {
        let mut child = Command::new("sh")
            .args(["-c", "echo out; echo err >&2"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let drain = Drain::start(&mut child);
        child.wait().unwrap();
        let (stdout, stderr) = drain.join();

        assert_eq!(stdout.trim(), "out");
        assert_eq!(stderr.trim(), "err");
    }

    #[test]
    fn wait_limited_returns_status_for_quick_exit() {
        let mut child = Command::new("true").spawn().unwrap();
        let status = wait_limited(&mut child, Some(Duration::from_secs(5))).unwrap();
        assert!(status.is_some_and(|s| s.success()));
    }

    #[test]
    fn wait_limited_times_out_on_hung_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let status = wait_limited(&mut child, Some(Duration::from_millis(200))).unwrap();
        assert!(status.is_none());
        let _ = child.kill();
        let _ = child.wait();
    }
}
