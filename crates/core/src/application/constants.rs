// Execution constants (no magic values)
use std::time::Duration;

/// Interpreter used for shell commands
pub const DEFAULT_SHELL: &str = "sh";

/// Flag that makes the shell read its script from the next argument
pub const DEFAULT_SHELL_FLAG: &str = "-c";

/// Deadline applied by the CLI when none is given (30s)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding the shell interpreter
pub const SHELL_ENV_VAR: &str = "GRACE_SHELL";
