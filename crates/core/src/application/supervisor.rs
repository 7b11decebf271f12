// Deadline Supervisor
// Races a child's completion against its deadline and terminates the
// process group on overrun

use std::fmt;
use std::io;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::deadline::Deadline;
use crate::domain::Output;
use crate::port::{ExecutionError, GroupSignal, GroupSignaller};

/// Sender half handed to the background drain/wait unit
pub type CompletionSender = oneshot::Sender<Result<Output, ExecutionError>>;

/// Receiver half raced by [`supervise`]
pub type CompletionReceiver = oneshot::Receiver<Result<Output, ExecutionError>>;

/// One-shot completion signal: at most one value is ever delivered
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    oneshot::channel()
}

/// Terminal state of one supervised call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionOutcome {
    /// The child finished (successfully or not) before the deadline
    Completed,
    /// Deadline hit, SIGTERM delivered to the group
    TimedOutSignaled,
    /// Deadline hit, SIGTERM failed, SIGKILL delivered
    TimedOutKilled,
    /// Deadline hit and neither signal could be delivered
    TimedOutKillFailed,
}

impl SupervisionOutcome {
    /// Classify the result returned by [`supervise`]
    pub fn of(result: &Result<Output, ExecutionError>) -> Self {
        match result {
            Err(ExecutionError::Timeout {
                signal: GroupSignal::Terminate,
                ..
            }) => SupervisionOutcome::TimedOutSignaled,
            Err(ExecutionError::Timeout {
                signal: GroupSignal::Kill,
                ..
            }) => SupervisionOutcome::TimedOutKilled,
            Err(ExecutionError::TimeoutKillFailed { .. }) => SupervisionOutcome::TimedOutKillFailed,
            _ => SupervisionOutcome::Completed,
        }
    }
}

impl fmt::Display for SupervisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisionOutcome::Completed => write!(f, "COMPLETED"),
            SupervisionOutcome::TimedOutSignaled => write!(f, "TIMED_OUT_SIGNALED"),
            SupervisionOutcome::TimedOutKilled => write!(f, "TIMED_OUT_KILLED"),
            SupervisionOutcome::TimedOutKillFailed => write!(f, "TIMED_OUT_KILL_FAILED"),
        }
    }
}

/// Terminate a process group: SIGTERM first, SIGKILL only if SIGTERM
/// could not be sent.
///
/// Returns the signal that was delivered. Does not wait for the group to
/// actually exit.
///
/// # Errors
/// The OS error from the SIGKILL send when both sends fail.
pub fn terminate_group<S>(signaller: &S, pgid: i32, command: &str) -> io::Result<GroupSignal>
where
    S: GroupSignaller + ?Sized,
{
    let graceful = match signaller.signal_group(pgid, GroupSignal::Terminate) {
        Ok(()) => {
            info!(pgid = %pgid, "Sent SIGTERM to process group");
            return Ok(GroupSignal::Terminate);
        }
        Err(e) => e,
    };

    warn!(
        pid = %pgid,
        cmd = %command,
        error = %graceful,
        "SIGTERM failed, sending SIGKILL"
    );

    match signaller.signal_group(pgid, GroupSignal::Kill) {
        Ok(()) => Ok(GroupSignal::Kill),
        Err(e) => {
            error!(pid = %pgid, cmd = %command, error = %e, "SIGKILL failed");
            Err(e)
        }
    }
}

/// Wait for whichever happens first: the completion signal or the deadline.
///
/// - Completion first: its value is returned as-is.
/// - Deadline first: the group led by `pgid` is terminated and a timeout
///   error is returned. Any completion arriving later is dropped with the
///   receiver.
///
/// If both are ready at once the completion wins.
pub async fn supervise<S>(
    mut completion: CompletionReceiver,
    deadline: &Deadline,
    pgid: i32,
    signaller: &S,
    command: &str,
) -> Result<Output, ExecutionError>
where
    S: GroupSignaller + ?Sized,
{
    tokio::select! {
        biased;

        delivered = &mut completion => match delivered {
            Ok(result) => result,
            Err(_) => {
                debug!(pgid = %pgid, "Completion unit ended without reporting");
                Err(ExecutionError::Wait(io::Error::other(
                    "completion unit ended without reporting a result",
                )))
            }
        },

        _ = deadline.expired() => {
            debug!(pgid = %pgid, cmd = %command, "Deadline expired before completion");
            match terminate_group(signaller, pgid, command) {
                Ok(signal) => Err(ExecutionError::Timeout { pgid, signal }),
                Err(source) => Err(ExecutionError::TimeoutKillFailed { pgid, source }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::deadline::cancel_channel;
    use crate::port::group_signaller::mocks::ScriptedSignaller;
    use std::time::Duration;

    const PGID: i32 = 31337;

    #[tokio::test]
    async fn test_completion_before_deadline() {
        let (tx, rx) = completion_channel();
        let signaller = ScriptedSignaller::delivering();
        tx.send(Ok(Output::new("hi", "", 7))).unwrap();

        let result = supervise(
            rx,
            &Deadline::after(Duration::from_secs(5)),
            PGID,
            &signaller,
            "test",
        )
        .await;

        assert_eq!(result.unwrap().exit_code, 7);
        assert!(signaller.calls().is_empty(), "no signal on completion");
    }

    #[tokio::test]
    async fn test_completion_error_is_returned() {
        let (tx, rx) = completion_channel();
        let signaller = ScriptedSignaller::delivering();
        tx.send(Err(ExecutionError::Wait(io::Error::other("boom"))))
            .unwrap();

        let result = supervise(rx, &Deadline::never(), PGID, &signaller, "test").await;

        assert!(matches!(result, Err(ExecutionError::Wait(_))));
        assert_eq!(SupervisionOutcome::of(&result), SupervisionOutcome::Completed);
    }

    #[tokio::test]
    async fn test_ready_completion_wins_over_expired_deadline() {
        let (tx, rx) = completion_channel();
        let signaller = ScriptedSignaller::delivering();
        tx.send(Ok(Output::default())).unwrap();

        let result = supervise(
            rx,
            &Deadline::after(Duration::ZERO),
            PGID,
            &signaller,
            "test",
        )
        .await;

        assert!(result.is_ok());
        assert!(signaller.calls().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_sends_sigterm_only() {
        let (_tx, rx) = completion_channel();
        let signaller = ScriptedSignaller::delivering();

        let result = supervise(
            rx,
            &Deadline::after(Duration::from_millis(10)),
            PGID,
            &signaller,
            "sleep 10",
        )
        .await;

        assert!(matches!(
            result,
            Err(ExecutionError::Timeout {
                pgid: PGID,
                signal: GroupSignal::Terminate
            })
        ));
        assert_eq!(
            SupervisionOutcome::of(&result),
            SupervisionOutcome::TimedOutSignaled
        );
        assert_eq!(signaller.calls(), vec![(PGID, GroupSignal::Terminate)]);
    }

    #[tokio::test]
    async fn test_sigterm_failure_escalates_to_sigkill() {
        let (_tx, rx) = completion_channel();
        let signaller = ScriptedSignaller::failing_terminate();

        let result = supervise(
            rx,
            &Deadline::after(Duration::from_millis(10)),
            PGID,
            &signaller,
            "sleep 10",
        )
        .await;

        let err = result.as_ref().unwrap_err();
        assert!(err.is_timeout());
        assert!(!err.is_kill_failure());
        assert_eq!(
            SupervisionOutcome::of(&result),
            SupervisionOutcome::TimedOutKilled
        );
        assert_eq!(
            signaller.calls(),
            vec![(PGID, GroupSignal::Terminate), (PGID, GroupSignal::Kill)]
        );
    }

    #[tokio::test]
    async fn test_both_signals_failing_is_composite() {
        let (_tx, rx) = completion_channel();
        let signaller = ScriptedSignaller::failing_all();

        let result = supervise(
            rx,
            &Deadline::after(Duration::from_millis(10)),
            PGID,
            &signaller,
            "sleep 10",
        )
        .await;

        let err = result.as_ref().unwrap_err();
        assert!(err.is_timeout());
        assert!(err.is_kill_failure());
        assert_eq!(
            err.os_error().map(io::Error::kind),
            Some(io::ErrorKind::NotFound)
        );
        assert_eq!(
            SupervisionOutcome::of(&result),
            SupervisionOutcome::TimedOutKillFailed
        );
    }

    #[tokio::test]
    async fn test_dropped_sender_is_wait_error() {
        let (tx, rx) = completion_channel();
        drop(tx);

        let result = supervise(
            rx,
            &Deadline::never(),
            PGID,
            &ScriptedSignaller::delivering(),
            "test",
        )
        .await;

        assert!(matches!(result, Err(ExecutionError::Wait(_))));
    }

    #[tokio::test]
    async fn test_cancelled_deadline_terminates() {
        let (handle, token) = cancel_channel();
        let (_tx, rx) = completion_channel();
        let signaller = ScriptedSignaller::delivering();
        handle.cancel();

        let result = supervise(rx, &Deadline::cancellable(token), PGID, &signaller, "x").await;

        assert!(result.unwrap_err().is_timeout());
    }
}
