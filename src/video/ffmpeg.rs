//! External tool resolution and invocation
//!
//! Resolution order for the ffmpeg binary:
//! 1) Explicit path passed by the caller
//! 2) `WATERMARK_FFMPEG_PATH` environment variable
//! 3) `ffmpeg` on PATH

use std::env;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Environment variable that overrides the ffmpeg binary
pub const FFMPEG_PATH_ENV: &str = "WATERMARK_FFMPEG_PATH";

/// Upper bound on a single ffmpeg run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Keep only this many trailing bytes of stderr in errors
const STDERR_TAIL: usize = 2048;

/// Get path to the ffmpeg binary
pub fn ffmpeg_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match env::var_os(FFMPEG_PATH_ENV) {
        Some(v) if !v.is_empty() => PathBuf::from(v),
        _ => PathBuf::from("ffmpeg"),
    }
}

/// Run `program` with `args`, waiting at most `timeout`.
///
/// Succeeds only on exit status zero. On timeout the process is killed.
pub fn run_tool(program: &Path, args: &[OsString], timeout: Option<Duration>) -> Result<()> {
    let tool = program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string());
    debug!(tool = %tool, ?args, "running external tool");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ToolNotFound(program.to_path_buf()),
            _ => Error::Io(e),
        })?;

    // Drain stderr on its own thread so a chatty tool can't block on a full pipe
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    });

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                warn!(tool = %tool, "timed out after {:?}, killing", limit);
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::ToolTimeout {
                    tool,
                    seconds: limit.as_secs(),
                });
            }
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if status.success() {
        debug!(tool = %tool, elapsed = ?started.elapsed(), "external tool finished");
        Ok(())
    } else {
        Err(Error::ExternalTool {
            tool,
            code: status.code(),
            stderr: tail(&stderr, STDERR_TAIL).trim().to_string(),
        })
    }
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = ffmpeg_path(Some(Path::new("/opt/ffmpeg/bin/ffmpeg")));
        assert_eq!(path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let err = run_tool(Path::new("/nonexistent/ffmpeg-missing"), &[], None).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("aé", 1), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_checked() {
        let sh = Path::new("/bin/sh");
        run_tool(sh, &["-c".into(), "exit 0".into()], None).unwrap();

        let err = run_tool(sh, &["-c".into(), "echo boom >&2; exit 3".into()], None).unwrap_err();
        match err {
            Error::ExternalTool { tool, code, stderr } => {
                assert_eq!(tool, "sh");
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let err = run_tool(
            Path::new("/bin/sh"),
            &["-c".into(), "sleep 10".into()],
            Some(Duration::from_millis(200)),
        )
        .unwrap_err();

        assert!(matches!(err, Error::ToolTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
