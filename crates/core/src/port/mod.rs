// Port Layer - Interfaces for OS collaborators

pub mod group_signaller;
pub mod process_runner;

// Re-exports
pub use group_signaller::{GroupSignal, GroupSignaller};
pub use process_runner::{ExecutionError, ProcessRunner, StreamName};
