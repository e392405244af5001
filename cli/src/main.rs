// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # ASMS control plane CLI
//!
//! The `asms` binary hosts the unit registry in-process, with every domain
//! running on mock providers and in-memory stores.
//!
//! ## Commands
//!
//! - `asms units [--domain D]` / `asms describe <unit>` - Discovery
//! - `asms exec <unit> [--input JSON]` / `asms stream <unit>` - Execution
//! - `asms resources` / `asms get <uri>` / `asms watch <uri>` - Resources
//! - `asms config show|validate|generate` - Configuration management

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use asms_control_plane::commands::{self, ConfigCommand};
use asms_control_plane::logging::{init_logging, LogFormat};
use asms_control_plane::runtime::Runtime;

/// ASMS control plane - discover, execute, stream and watch units
#[derive(Parser)]
#[command(name = "asms")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "ASMS_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered units
    Units {
        /// Only units of this domain
        #[arg(long)]
        domain: Option<String>,
    },

    /// Print a unit's schemas and examples as JSON
    Describe {
        #[arg(value_name = "UNIT")]
        unit: String,
    },

    /// Execute a unit and print its output
    Exec {
        #[arg(value_name = "UNIT")]
        unit: String,

        /// Input object as JSON
        #[arg(short, long)]
        input: Option<String>,

        /// Print the domain and lifecycle events raised by the call
        #[arg(long)]
        events: bool,
    },

    /// Execute a unit's streaming variant, printing frames as they arrive
    Stream {
        #[arg(value_name = "UNIT")]
        unit: String,

        /// Input object as JSON
        #[arg(short, long)]
        input: Option<String>,

        /// Print the domain and lifecycle events raised by the call
        #[arg(long)]
        events: bool,
    },

    /// List static resources and resource patterns
    Resources,

    /// Print a resource snapshot
    Get {
        #[arg(value_name = "URI")]
        uri: String,
    },

    /// Print resource updates until Ctrl-C
    Watch {
        #[arg(value_name = "URI")]
        uri: String,

        /// Stop after this many updates
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.log_format)?;

    let Some(command) = cli.command else {
        eprintln!("{}", "No command specified. Use --help for usage.".yellow());
        return Ok(ExitCode::FAILURE);
    };

    if let Commands::Config { command } = command {
        commands::config::handle_command(command, cli.config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let runtime = Runtime::load(cli.config)?;
    match command {
        Commands::Units { domain } => commands::units::list(&runtime, domain.as_deref()).map(|_| ExitCode::SUCCESS),
        Commands::Describe { unit } => commands::units::describe(&runtime, &unit).map(|_| ExitCode::SUCCESS),
        Commands::Exec { unit, input, events } => {
            commands::exec::exec(&runtime, &unit, input.as_deref(), events).await
        }
        Commands::Stream { unit, input, events } => {
            commands::exec::stream(&runtime, &unit, input.as_deref(), events).await
        }
        Commands::Resources => commands::resources::list(&runtime).map(|_| ExitCode::SUCCESS),
        Commands::Get { uri } => commands::resources::get(&runtime, &uri).await,
        Commands::Watch { uri, count } => commands::resources::watch(&runtime, &uri, count).await,
        Commands::Config { .. } => Ok(ExitCode::SUCCESS),
    }
}
