// Domain Layer - Command and result types

pub mod command;
pub mod error;
pub mod output;

// Re-exports
pub use command::CommandSpec;
pub use error::DomainError;
pub use output::Output;
