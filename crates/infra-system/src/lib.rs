// Grace Infrastructure - System Adapters
// Implements: ProcessRunner (SubprocessSpawner), GroupSignaller (NixGroupSignaller)

pub mod config;
pub mod group_signaller;
pub mod subprocess_spawner;

pub use config::SpawnerConfig;
pub use group_signaller::{group_alive, NixGroupSignaller};
pub use subprocess_spawner::SubprocessSpawner;

use std::time::Duration;

use grace_core::application::{runner, Deadline};
use grace_core::domain::{CommandSpec, Output};
use grace_core::port::{ExecutionError, ProcessRunner};

/// Launch `spec` with the default spawner and supervise it until `deadline`
pub async fn spawn(deadline: Deadline, spec: &CommandSpec) -> Result<Output, ExecutionError> {
    SubprocessSpawner::default().spawn(deadline, spec).await
}

/// Run a whitespace-tokenized command line, returning stdout then stderr
pub async fn run_with_timeout(
    timeout: Duration,
    command_line: &str,
) -> Result<String, ExecutionError> {
    runner::run_with_timeout(&SubprocessSpawner::default(), timeout, command_line).await
}

/// Run text through `sh -c`, returning stdout then stderr
///
/// The text is passed verbatim as one argument; quoting is up to the caller.
pub async fn run_shell_with_timeout(
    timeout: Duration,
    shell_command: &str,
) -> Result<String, ExecutionError> {
    runner::run_shell_with_timeout(&SubprocessSpawner::default(), timeout, shell_command).await
}
