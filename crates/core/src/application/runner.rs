// Convenience entry points over any ProcessRunner

use std::time::Duration;

use tracing::debug;

use super::deadline::Deadline;
use crate::domain::CommandSpec;
use crate::port::{ExecutionError, ProcessRunner};

/// Run a whitespace-tokenized command line and return stdout followed by
/// stderr.
///
/// A non-zero exit still yields the captured text. On any error no text is
/// returned.
pub async fn run_with_timeout<R>(
    runner: &R,
    timeout: Duration,
    command_line: &str,
) -> Result<String, ExecutionError>
where
    R: ProcessRunner + ?Sized,
{
    let spec = CommandSpec::parse(command_line)?;
    run_spec(runner, timeout, spec).await
}

/// Run `shell_command` through the runner's shell (`sh -c` by default).
///
/// The text reaches the shell untouched, as a single argument.
pub async fn run_shell_with_timeout<R>(
    runner: &R,
    timeout: Duration,
    shell_command: &str,
) -> Result<String, ExecutionError>
where
    R: ProcessRunner + ?Sized,
{
    let spec = runner.shell_command(shell_command);
    run_spec(runner, timeout, spec).await
}

async fn run_spec<R>(
    runner: &R,
    timeout: Duration,
    spec: CommandSpec,
) -> Result<String, ExecutionError>
where
    R: ProcessRunner + ?Sized,
{
    debug!(cmd = %spec, timeout_ms = %timeout.as_millis(), "Running with timeout");
    let output = runner.spawn(Deadline::after(timeout), &spec).await?;
    Ok(output.combine())
}
