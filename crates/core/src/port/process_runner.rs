// Process Runner Port
// Abstraction for launching a command under a deadline

use std::fmt;
use std::io;

use async_trait::async_trait;
use thiserror::Error;

use super::group_signaller::GroupSignal;
use crate::application::deadline::Deadline;
use crate::domain::{CommandSpec, DomainError, Output};

/// Which output pipe a stream error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamName {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamName::Stdout => write!(f, "stdout"),
            StreamName::Stderr => write!(f, "stderr"),
        }
    }
}

/// Execution errors
///
/// A non-zero exit code is never one of these; it is reported inside
/// a successful [`Output`].
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Invalid command: {0}")]
    InvalidCommand(#[from] DomainError),

    #[error("Launch failed for '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {stream}: {source}")]
    Stream {
        stream: StreamName,
        #[source]
        source: io::Error,
    },

    #[error("Wait failed: {0}")]
    Wait(#[source] io::Error),

    #[error("Process group {pgid} timed out ({signal} delivered)")]
    Timeout { pgid: i32, signal: GroupSignal },

    #[error("Process group {pgid} timed out and could not be killed: {source}")]
    TimeoutKillFailed {
        pgid: i32,
        #[source]
        source: io::Error,
    },
}

impl ExecutionError {
    /// True for every deadline outcome, whether or not the kill landed
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ExecutionError::Timeout { .. } | ExecutionError::TimeoutKillFailed { .. }
        )
    }

    /// True only when the process group may have been left running
    pub fn is_kill_failure(&self) -> bool {
        matches!(self, ExecutionError::TimeoutKillFailed { .. })
    }

    /// Underlying OS error, if this failure carries one
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            ExecutionError::Launch { source, .. }
            | ExecutionError::Stream { source, .. }
            | ExecutionError::Wait(source)
            | ExecutionError::TimeoutKillFailed { source, .. } => Some(source),
            ExecutionError::InvalidCommand(_) | ExecutionError::Timeout { .. } => None,
        }
    }
}

/// Process Runner trait
///
/// Implementations:
/// - SubprocessSpawner: real OS processes in their own process group
/// - mocks::MockProcessRunner: canned outcomes for callers' tests
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Launch `spec`, capture its output and supervise it until `deadline`
    ///
    /// # Errors
    /// - ExecutionError::Launch if the process or its pipes cannot be set up
    /// - ExecutionError::Stream if an output pipe cannot be fully read
    /// - ExecutionError::Wait if reaping fails or the process dies by signal
    /// - ExecutionError::Timeout if the deadline fired and the group was signalled
    /// - ExecutionError::TimeoutKillFailed if no signal could be delivered
    async fn spawn(&self, deadline: Deadline, spec: &CommandSpec)
        -> Result<Output, ExecutionError>;

    /// Build the spec used to run `text` through a shell
    fn shell_command(&self, text: &str) -> CommandSpec {
        CommandSpec::shell(text)
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock runner behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Complete with the given output
        Complete(Output),
        /// Fail to launch with message
        LaunchFail(String),
        /// Report a deadline overrun
        Timeout,
    }

    /// Mock Process Runner for testing
    pub struct MockProcessRunner {
        behavior: Arc<Mutex<MockBehavior>>,
        specs: Arc<Mutex<Vec<CommandSpec>>>,
    }

    impl MockProcessRunner {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                specs: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_complete(output: Output) -> Self {
            Self::new(MockBehavior::Complete(output))
        }

        pub fn new_timeout() -> Self {
            Self::new(MockBehavior::Timeout)
        }

        /// Specs passed to `spawn`, in call order
        pub fn specs(&self) -> Vec<CommandSpec> {
            self.specs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for MockProcessRunner {
        async fn spawn(
            &self,
            _deadline: Deadline,
            spec: &CommandSpec,
        ) -> Result<Output, ExecutionError> {
            self.specs.lock().unwrap().push(spec.clone());

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Complete(output) => Ok(output),
                MockBehavior::LaunchFail(msg) => Err(ExecutionError::Launch {
                    program: spec.program.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, msg),
                }),
                MockBehavior::Timeout => Err(ExecutionError::Timeout {
                    pgid: 4242,
                    signal: GroupSignal::Terminate,
                }),
            }
        }
    }
}
