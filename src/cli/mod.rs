//! Command-line interface for private-tab.
//!
//! The binary is a maintenance tool around the engine's file formats: it
//! strips private tabs from saved session snapshots and manages the config
//! file. Command implementations live in the [`commands`] submodule.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// private-tab - per-tab private browsing state tools
#[derive(Parser, Debug)]
#[command(name = "private-tab")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set debug log level (overrides config and PRIVATE_TAB_DEBUG_LEVEL)
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,

    /// Config file to use instead of ~/.config/private-tab/config.yaml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Remove private tabs from a saved session snapshot
    FilterSession {
        /// Session snapshot (JSON) to read
        input: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Keep private entries in the closed-tab history
        #[arg(long)]
        keep_closed: bool,
    },

    /// Load and validate a config file
    CheckConfig {
        /// Config file (default location if omitted)
        path: Option<PathBuf>,
    },

    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Parse arguments, run the command and return the process exit code
pub fn process_cli(cli: Cli) -> i32 {
    let result = match cli.command {
        Commands::FilterSession {
            input,
            output,
            keep_closed,
        } => commands::filter_session_cli(
            &input,
            output.as_deref(),
            cli.config.as_deref(),
            keep_closed,
        ),
        Commands::CheckConfig { path } => {
            commands::check_config_cli(path.as_deref().or(cli.config.as_deref()))
        }
        Commands::InitConfig { force } => commands::init_config_cli(cli.config.as_deref(), force),
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("private-tab: error: {e:#}");
            1
        }
    }
}
