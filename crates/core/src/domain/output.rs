// Process Output Domain Model

use serde::{Deserialize, Serialize};

/// Captured result of a process that ran to completion.
///
/// Only produced when the process exited through a reported status, so
/// `exit_code` is always the real status. A non-zero code is data, not an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl Output {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Build from raw pipe bytes, replacing invalid UTF-8
    pub fn from_bytes(stdout: &[u8], stderr: &[u8], exit_code: i32) -> Self {
        Self::new(
            String::from_utf8_lossy(stdout),
            String::from_utf8_lossy(stderr),
            exit_code,
        )
    }

    /// Stdout followed by stderr
    pub fn combine(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len());
        text.push_str(&self.stdout);
        text.push_str(&self.stderr);
        text
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
