//! Scripted [`CommandRunner`] for tests in this and downstream crates.

use anyhow::{Result, bail};
use std::cell::RefCell;
use std::time::Duration;

use crate::runner::{CommandRunner, ProcessOutput};

/// Pops canned outputs in call order and records every invocation.
pub struct FakeRunner {
    outputs: RefCell<Vec<ProcessOutput>>,
    pub calls: RefCell<Vec<(String, Vec<String>)>>,
    missing: Vec<String>,
}

impl FakeRunner {
    pub fn new(outputs: Vec<ProcessOutput>) -> Self {
        Self {
            outputs: RefCell::new(outputs),
            calls: RefCell::new(Vec::new()),
            missing: Vec::new(),
        }
    }

    /// Mark a program as absent from PATH.
    pub fn with_missing(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    pub fn ok(stdout: &str) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
            timed_out: false,
        }
    }

    pub fn failed(stderr: &str) -> ProcessOutput {
        ProcessOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code: Some(1),
            timed_out: false,
        }
    }

    pub fn timeout() -> ProcessOutput {
        ProcessOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            timed_out: true,
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        _stdin_data: Option<&str>,
        _timeout: Duration,
    ) -> Result<ProcessOutput> {
        self.calls.borrow_mut().push((
            program.to_string(),
            args.iter().map(|s| s.to_string()).collect(),
        ));
        let mut outputs = self.outputs.borrow_mut();
        if outputs.is_empty() {
            bail!("FakeRunner: no more scripted outputs");
        }
        Ok(outputs.remove(0))
    }

    fn available(&self, program: &str) -> bool {
        !self.missing.iter().any(|m| m == program)
    }
}
