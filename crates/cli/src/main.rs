//! Grace CLI - run a command under a deadline
//! The child gets its own process group; on overrun the whole group is
//! terminated.

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use grace_core::application::constants::DEFAULT_TIMEOUT;
use grace_core::application::{cancel_channel, Deadline};
use grace_core::{CommandSpec, ExecutionError, Output, ProcessRunner};
use grace_infra_system::{SpawnerConfig, SubprocessSpawner};

use crate::logging::{init_logging, LogFormat};

/// Exit status when the deadline expired (matches coreutils `timeout`)
const TIMEOUT_EXIT_CODE: u8 = 124;

/// Exit status when the command could not be run or reaped
const FAILURE_EXIT_CODE: u8 = 125;

#[derive(Parser)]
#[command(name = "grace")]
#[command(about = "Run a command with a deadline and clean process-group teardown", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Deadline in milliseconds
    #[arg(long, global = true, env = "GRACE_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// Print the captured result as JSON instead of replaying it
    #[arg(long, global = true)]
    json: bool,

    /// Log output format
    #[arg(long, global = true, env = "GRACE_LOG_FORMAT", value_enum, default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program with arguments (no shell)
    Run {
        /// Extra environment variable (KEY=VALUE), repeatable
        #[arg(short, long = "env", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,

        /// Working directory for the child
        #[arg(short = 'C', long)]
        dir: Option<PathBuf>,

        /// Program followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Run text through the shell (sh -c by default, see GRACE_SHELL)
    Sh {
        /// Shell text, passed to the shell verbatim
        script: String,
    },
}

fn parse_env_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

fn build_spec(command: Commands, spawner: &SubprocessSpawner) -> Result<CommandSpec> {
    let spec = match command {
        Commands::Run { env, dir, command } => {
            let mut parts = command.into_iter();
            let program = parts.next().context("Missing program to run")?;
            let mut spec = CommandSpec::new(program).args(parts).envs(env);
            if let Some(dir) = dir {
                spec = spec.current_dir(dir);
            }
            spec
        }
        Commands::Sh { script } => spawner.shell_command(&script),
    };
    Ok(spec)
}

fn report_output(output: &Output, as_json: bool) -> Result<ExitCode> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(output)?);
    } else {
        print!("{}", output.stdout);
        eprint!("{}", output.stderr);
    }

    Ok(ExitCode::from(u8::try_from(output.exit_code).unwrap_or(1)))
}

fn report_error(err: &ExecutionError, as_json: bool) -> Result<ExitCode> {
    if as_json {
        let body = json!({
            "error": err.to_string(),
            "timed_out": err.is_timeout(),
            "kill_failed": err.is_kill_failure(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else if err.is_timeout() {
        eprintln!("{} {}", "✗ Timed out:".red().bold(), err);
        if err.is_kill_failure() {
            eprintln!("{}", "  process group may still be running".yellow());
        }
    } else {
        eprintln!("{} {}", "✗ Execution failed:".red().bold(), err);
    }

    Ok(ExitCode::from(if err.is_timeout() {
        TIMEOUT_EXIT_CODE
    } else {
        FAILURE_EXIT_CODE
    }))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    let config = SpawnerConfig::from_env().context("Invalid spawner configuration")?;
    let spawner = SubprocessSpawner::new(config);
    let spec = build_spec(cli.command, &spawner)?;

    // The child is not in our process group, so Ctrl-C must be forwarded
    // by expiring the deadline early.
    let (cancel, token) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl+C received, cancelling");
            cancel.cancel();
        }
    });

    let deadline = Deadline::after(Duration::from_millis(cli.timeout_ms)).with_cancel(token);

    match spawner.spawn(deadline, &spec).await {
        Ok(output) => report_output(&output, cli.json),
        Err(err) => report_error(&err, cli.json),
    }
}
