//! `bulwark` - inspect and validate resilience configuration.
//!
//! Works without a running service: every command runs the same validation
//! and resolution code the orchestrator uses at startup.
//!
//! This is a CLI tool, so `println!` and `eprintln!` are intentionally used
//! for user-facing output rather than structured logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use bulwark_infra::{init_tracing, LogFormat};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info_span};

mod commands;

/// Bulwark resilience configuration tool
#[derive(Debug, Parser)]
#[command(name = "bulwark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log format for diagnostics on stderr (pretty or json)
    #[arg(long, global = true, default_value = "pretty", env = "BULWARK_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a custom override payload; exits non-zero when invalid.
    Validate {
        #[command(flatten)]
        input: PayloadInput,

        /// Print the validation result as JSON.
        #[arg(long)]
        json_output: bool,
    },

    /// List built-in presets.
    Presets {
        /// Show description, strategies and parameters for each preset.
        #[arg(short, long)]
        details: bool,
    },

    /// Recommend a preset for an environment name.
    Recommend {
        /// Environment hint such as `prod`, `staging` or `local`.
        hint: String,
    },

    /// Print the resolved configuration as JSON.
    Resolve {
        /// Preset name; when omitted, configuration is loaded from the
        /// environment or a config file.
        #[arg(short, long)]
        preset: Option<String>,

        /// Custom override payload (JSON).
        #[arg(short, long)]
        custom: Option<String>,

        /// Resolve for this operation instead of the default.
        #[arg(short, long)]
        operation: Option<String>,

        /// Strategy the operation is registered with.
        #[arg(short, long, requires = "operation")]
        strategy: Option<String>,
    },
}

/// Where `validate` reads its payload from
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct PayloadInput {
    /// Payload file (`.json` or `.toml`).
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Payload given inline as JSON.
    #[arg(short, long)]
    json: Option<String>,
}

impl Command {
    const fn name(&self) -> &'static str {
        match self {
            Self::Validate { .. } => "validate",
            Self::Presets { .. } => "presets",
            Self::Recommend { .. } => "recommend",
            Self::Resolve { .. } => "resolve",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let span = info_span!("command", name = cli.command.name());
    let _guard = span.enter();
    debug!(log_format = %cli.log_format, "Running command");

    let result = match cli.command {
        Command::Validate { input, json_output } => {
            commands::validate(input.file.as_deref(), input.json.as_deref(), json_output)
        }
        Command::Presets { details } => commands::presets(details),
        Command::Recommend { hint } => commands::recommend(&hint),
        Command::Resolve { preset, custom, operation, strategy } => commands::resolve(
            preset.as_deref(),
            custom.as_deref(),
            operation.as_deref(),
            strategy.as_deref(),
        ),
    };

    match result {
        Ok(code) => {
            debug!(?code, "Command finished");
            code
        }
        Err(e) => {
            debug!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
