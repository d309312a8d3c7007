use anyhow::{Context, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of running an external command.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Process exit code; `None` when the command timed out and was killed.
    pub exit_code: Option<i32>,
    /// True when the bounded wait expired before the process exited.
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs external commands. The single seam for mocking subprocess calls
/// in tests; production code uses [`SystemRunner`].
pub trait CommandRunner {
    /// Run `program` with `args`, feeding `stdin_data` if present, waiting
    /// at most `timeout`.
    fn run(
        &self,
        program: &str,
        args: &[&str],
        stdin_data: Option<&str>,
        timeout: Duration,
    ) -> Result<ProcessOutput>;

    /// Returns true when `program` resolves on PATH.
    fn available(&self, program: &str) -> bool;
}

/// Production runner backed by `std::process::Command`.
///
/// The wait is a poll loop over `try_wait`; on expiry the child is killed
/// and the output is marked `timed_out`. Output pipes are drained after
/// exit, which is safe for the small outputs these probes produce.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        stdin_data: Option<&str>,
        timeout: Duration,
    ) -> Result<ProcessOutput> {
        debug!(program, ?args, "spawning subprocess");
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn '{program}'"))?;

        if let Some(data) = stdin_data {
            use std::io::Write;
            if let Some(mut stdin) = child.stdin.take() {
                // A dead child closes the pipe; the poll loop below reports it.
                let _ = stdin.write_all(data.as_bytes());
            }
        }

        let deadline = Instant::now() + timeout;
        let mut timed_out = false;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break Some(status),
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    timed_out = true;
                    break None;
                }
                None => std::thread::sleep(Duration::from_millis(25)),
            }
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        if let Some(mut out) = child.stdout.take() {
            let _ = out.read_to_string(&mut stdout);
        }
        if let Some(mut err) = child.stderr.take() {
            let _ = err.read_to_string(&mut stderr);
        }

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: status.and_then(|s| s.code()),
            timed_out,
        })
    }

    fn available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_stdout() {
        let out = SystemRunner
            .run("echo", &["hello"], None, Duration::from_secs(5))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_run_nonzero_exit() {
        let out = SystemRunner
            .run("sh", &["-c", "exit 3"], None, Duration::from_secs(5))
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, Some(3));
    }

    #[test]
    fn test_run_timeout_kills_child() {
        let out = SystemRunner
            .run("sleep", &["30"], None, Duration::from_millis(200))
            .unwrap();
        assert!(out.timed_out);
        assert!(!out.success());
        assert_eq!(out.exit_code, None);
    }

    #[test]
    fn test_run_stdin_piped() {
        let out = SystemRunner
            .run("cat", &[], Some("piped input"), Duration::from_secs(5))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "piped input");
    }

    #[test]
    fn test_available() {
        assert!(SystemRunner.available("sh"));
        assert!(!SystemRunner.available("definitely-not-a-binary-7f3a"));
    }

    #[test]
    fn test_spawn_missing_binary_is_error() {
        let res = SystemRunner.run(
            "definitely-not-a-binary-7f3a",
            &[],
            None,
            Duration::from_secs(1),
        );
        assert!(res.is_err());
    }
}
