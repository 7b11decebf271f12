// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Command line is empty")]
    EmptyCommandLine,

    #[error("Program name is empty")]
    EmptyProgram,
}

pub type Result<T> = std::result::Result<T, DomainError>;
