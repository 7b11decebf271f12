// Command Spec Domain Model

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use crate::application::constants::{DEFAULT_SHELL, DEFAULT_SHELL_FLAG};

/// Everything needed to launch one child process.
///
/// A spec is immutable once handed to a runner; ownership of the process it
/// describes passes to the OS on launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Executable path or interpreter (resolved through `PATH` when bare)
    pub program: String,
    pub args: Vec<String>,
    /// Overrides applied on top of the inherited environment, passed verbatim
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    /// Tokenize a single command line on whitespace.
    ///
    /// The first token is the program, the rest are arguments. No quote
    /// handling is performed; callers needing shell syntax should use
    /// [`CommandSpec::shell`].
    ///
    /// # Example
    /// ```
    /// use grace_core::domain::CommandSpec;
    ///
    /// let spec = CommandSpec::parse("ls -la /tmp").unwrap();
    /// assert_eq!(spec.program, "ls");
    /// assert_eq!(spec.args, vec!["-la", "/tmp"]);
    /// ```
    pub fn parse(command_line: &str) -> Result<Self> {
        let mut tokens = command_line.split_whitespace();
        let program = tokens.next().ok_or(DomainError::EmptyCommandLine)?;
        Ok(Self::new(program).args(tokens))
    }

    /// Run `text` through the default POSIX shell (`sh -c`).
    ///
    /// The text is handed to the shell as one argument, exactly as given.
    /// Quoting is the caller's job.
    pub fn shell(text: impl Into<String>) -> Self {
        Self::shell_with(DEFAULT_SHELL, DEFAULT_SHELL_FLAG, text)
    }

    /// Same as [`CommandSpec::shell`] with an explicit interpreter and flag.
    pub fn shell_with(
        shell: impl Into<String>,
        flag: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(shell).arg(flag).arg(text)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Reject specs that can never be launched
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(DomainError::EmptyProgram);
        }
        Ok(())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
