// Spawner configuration

use std::path::PathBuf;

use grace_core::application::constants::{DEFAULT_SHELL, DEFAULT_SHELL_FLAG, SHELL_ENV_VAR};
use grace_core::{AppError, Result};

/// Settings for [`crate::SubprocessSpawner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnerConfig {
    /// Interpreter used by shell commands
    pub shell: PathBuf,
    /// Flag passed before the script text
    pub shell_flag: String,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            shell_flag: DEFAULT_SHELL_FLAG.to_string(),
        }
    }
}

impl SpawnerConfig {
    /// Defaults, with the shell overridden by `GRACE_SHELL` when set
    ///
    /// # Errors
    /// AppError::Config if `GRACE_SHELL` is set but blank
    pub fn from_env() -> Result<Self> {
        Self::with_shell_override(std::env::var(SHELL_ENV_VAR).ok())
    }

    fn with_shell_override(shell: Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(shell) = shell {
            if shell.trim().is_empty() {
                return Err(AppError::Config(format!("{} is set but empty", SHELL_ENV_VAR)));
            }
            config.shell = PathBuf::from(shell);
        }

        Ok(config)
    }
}
