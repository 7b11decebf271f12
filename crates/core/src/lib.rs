// Grace Core - Domain Types, Ports & Supervision
// NO OS process or signal dependencies (hexagonal architecture)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{Deadline, SupervisionOutcome};
pub use domain::{CommandSpec, Output};
pub use error::{AppError, Result};
pub use port::{ExecutionError, GroupSignal, GroupSignaller, ProcessRunner};
