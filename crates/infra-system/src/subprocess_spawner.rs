// Subprocess spawner implementation
// reason: tokio::process for async pipes and reaping, own process group per child
use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info, warn};

use grace_core::application::supervisor::{
    completion_channel, supervise, CompletionSender, SupervisionOutcome,
};
use grace_core::application::Deadline;
use grace_core::domain::{CommandSpec, Output};
use grace_core::port::{ExecutionError, GroupSignaller, ProcessRunner, StreamName};

use crate::config::SpawnerConfig;
use crate::group_signaller::NixGroupSignaller;

/// A launched child whose pipes have not been read yet
struct LaunchedProcess {
    child: Child,
    pid: i32,
    stdout: ChildStdout,
    stderr: ChildStderr,
}

/// Subprocess spawner
/// Starts each command as the leader of a fresh process group so that a
/// deadline can take down every descendant at once
pub struct SubprocessSpawner {
    config: SpawnerConfig,
    signaller: Arc<dyn GroupSignaller>,
}

impl Default for SubprocessSpawner {
    fn default() -> Self {
        Self::new(SpawnerConfig::default())
    }
}

impl SubprocessSpawner {
    /// Create a spawner that signals groups through `kill(2)`
    ///
    /// # Example
    /// ```ignore
    /// let spawner = SubprocessSpawner::new(SpawnerConfig::from_env()?);
    /// let output = spawner
    ///     .spawn(Deadline::after(Duration::from_secs(5)), &CommandSpec::parse("uname -a")?)
    ///     .await?;
    /// ```
    pub fn new(config: SpawnerConfig) -> Self {
        Self::with_signaller(config, Arc::new(NixGroupSignaller))
    }

    /// Create a spawner with a custom signaller (tests inject failures here)
    pub fn with_signaller(config: SpawnerConfig, signaller: Arc<dyn GroupSignaller>) -> Self {
        Self { config, signaller }
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Start the child in a new process group with both output pipes attached
    fn launch(&self, spec: &CommandSpec) -> Result<LaunchedProcess, ExecutionError> {
        let launch_error = |source: io::Error| ExecutionError::Launch {
            program: spec.program.clone(),
            source,
        };

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        // pgid == pid, so the negated pid addresses the whole tree
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(launch_error)?;

        let pid = child
            .id()
            .and_then(|id| i32::try_from(id).ok())
            .ok_or_else(|| launch_error(io::Error::other("child has no usable pid")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| launch_error(io::Error::other("stdout pipe missing")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| launch_error(io::Error::other("stderr pipe missing")))?;

        Ok(LaunchedProcess {
            child,
            pid,
            stdout,
            stderr,
        })
    }
}

/// Read one pipe to end-of-stream
async fn drain<R: AsyncRead + Unpin>(
    mut pipe: R,
    stream: StreamName,
) -> Result<Vec<u8>, ExecutionError> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)
        .await
        .map_err(|source| ExecutionError::Stream { stream, source })?;
    Ok(buf)
}

/// Drain both pipes, then reap the child.
///
/// The pipes are read concurrently so a child blocked on a full stderr
/// buffer cannot stall the stdout read.
async fn drain_and_wait(
    mut child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
) -> Result<Output, ExecutionError> {
    let (out, err) = tokio::try_join!(
        drain(stdout, StreamName::Stdout),
        drain(stderr, StreamName::Stderr)
    )?;

    let status = child.wait().await.map_err(ExecutionError::Wait)?;

    match status.code() {
        Some(code) => Ok(Output::from_bytes(&out, &err, code)),
        None => Err(ExecutionError::Wait(io::Error::other(format!(
            "process terminated abnormally ({})",
            status
        )))),
    }
}

/// Background unit: deliver exactly one result, then end
async fn watch_completion(launched: LaunchedProcess, completion: CompletionSender) {
    let LaunchedProcess {
        child,
        pid,
        stdout,
        stderr,
    } = launched;

    let result = drain_and_wait(child, stdout, stderr).await;

    if completion.send(result).is_err() {
        debug!(pid = %pid, "Supervisor already returned; discarding late completion");
    }
}

#[async_trait]
impl ProcessRunner for SubprocessSpawner {
    async fn spawn(
        &self,
        deadline: Deadline,
        spec: &CommandSpec,
    ) -> Result<Output, ExecutionError> {
        spec.validate()?;

        let started = Instant::now();
        let command = spec.to_string();

        info!(
            cmd = %command,
            working_dir = ?spec.working_dir,
            remaining_ms = ?deadline.remaining().map(|d| d.as_millis()),
            "Starting subprocess"
        );

        let launched = self.launch(spec)?;
        let pid = launched.pid;

        let (tx, rx) = completion_channel();
        tokio::spawn(watch_completion(launched, tx));

        let result = supervise(rx, &deadline, pid, self.signaller.as_ref(), &command).await;

        let duration_ms = started.elapsed().as_millis();
        let outcome = SupervisionOutcome::of(&result);
        match &result {
            Ok(output) => info!(
                pid = %pid,
                duration_ms = %duration_ms,
                exit_code = output.exit_code,
                outcome = %outcome,
                "Subprocess completed"
            ),
            Err(e) => warn!(
                pid = %pid,
                duration_ms = %duration_ms,
                outcome = %outcome,
                error = %e,
                "Subprocess failed"
            ),
        }

        result
    }

    fn shell_command(&self, text: &str) -> CommandSpec {
        CommandSpec::shell_with(
            self.config.shell.to_string_lossy(),
            self.config.shell_flag.as_str(),
            text,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spawner() -> SubprocessSpawner {
        SubprocessSpawner::default()
    }

    #[tokio::test]
    async fn test_execute_success() {
        let output = spawner()
            .spawn(
                Deadline::after(Duration::from_secs(10)),
                &CommandSpec::new("echo").arg("hello"),
            )
            .await
            .unwrap();

        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "");
        assert_eq!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let result = spawner()
            .spawn(
                Deadline::after(Duration::from_millis(100)),
                &CommandSpec::new("sleep").arg("10"),
            )
            .await;

        assert!(matches!(result, Err(ExecutionError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_success() {
        let output = spawner()
            .spawn(Deadline::after(Duration::from_secs(10)), &CommandSpec::shell("exit 7"))
            .await
            .unwrap();

        assert_eq!(output.exit_code, 7);
    }

    #[tokio::test]
    async fn test_env_and_working_dir_are_applied() {
        let spec = CommandSpec::shell("printf '%s:' \"$GRACE_TEST_VAR\"; pwd")
            .env("GRACE_TEST_VAR", "value1")
            .current_dir("/");

        let output = spawner()
            .spawn(Deadline::after(Duration::from_secs(10)), &spec)
            .await
            .unwrap();

        assert_eq!(output.stdout, "value1:/\n");
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let result = spawner()
            .spawn(
                Deadline::after(Duration::from_secs(10)),
                &CommandSpec::new("/nonexistent/grace-test-binary"),
            )
            .await;

        match result {
            Err(ExecutionError::Launch { program, source }) => {
                assert_eq!(program, "/nonexistent/grace-test-binary");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected launch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_signal_death_is_wait_error() {
        let result = spawner()
            .spawn(
                Deadline::after(Duration::from_secs(10)),
                &CommandSpec::shell("kill -9 $$"),
            )
            .await;

        assert!(matches!(result, Err(ExecutionError::Wait(_))));
    }

    #[test]
    fn test_shell_command_uses_config() {
        let spawner = SubprocessSpawner::new(SpawnerConfig {
            shell: "bash".into(),
            shell_flag: "-c".to_string(),
        });

        let spec = spawner.shell_command("echo $0");

        assert_eq!(spec.program, "bash");
        assert_eq!(spec.args, vec!["-c", "echo $0"]);
    }
}
