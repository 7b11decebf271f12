// Application Layer - Supervision and entry points

pub mod constants;
pub mod deadline;
pub mod runner;
pub mod supervisor;

// Re-exports
pub use deadline::{cancel_channel, CancelHandle, CancelToken, Deadline};
pub use runner::{run_shell_with_timeout, run_with_timeout};
pub use supervisor::{
    completion_channel, supervise, terminate_group, CompletionReceiver, CompletionSender,
    SupervisionOutcome,
};
