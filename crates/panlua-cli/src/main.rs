use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::LibraryArgs;

/// Run Lua scripts against a Lua library bound at startup.
///
/// The library is located and every entry point resolved before anything
/// runs; a missing library or symbol is reported up front.
///
/// EXAMPLES:
///     panlua run main.lua                  Run a script with Lua 5.4
///     panlua run main.lua --lib lua5.3     Bind a library by short name
///     panlua run main.lua --mode t         Refuse precompiled chunks
///     panlua symbols --lib ./liblua.so     List resolved entry points
///
/// ENVIRONMENT VARIABLES:
///     PANLUA_LOG            Log filter (default: warn)
///     PANLUA_CONFIG         Global config file (default: ~/.panlua/config.toml)
///     PANLUA_LIBRARY        Library path or short name
///     PANLUA_LUA_VERSION    Lua version as two digits
///     PANLUA_SEARCH_PATH    Extra library directories
#[derive(Parser)]
#[command(name = "panlua")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Log binding and dispatch details to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Lua script file
    ///
    /// Creates a fresh state, opens the standard libraries, loads and calls
    /// the script, then closes the state. The exit code is the engine's
    /// status: 0 on success, 3 for a syntax error, 2 for a runtime error,
    /// 6 when the file cannot be read.
    ///
    /// EXAMPLES:
    ///     panlua run main.lua
    ///     panlua run main.lua --lua-version 53 --no-libs
    #[command(visible_alias = "r")]
    Run {
        /// Path to the Lua script
        script: PathBuf,
        #[command(flatten)]
        library: LibraryArgs,
        /// Chunk mode: "b" (binary), "t" (text) or "bt"
        #[arg(long, value_name = "MODE")]
        mode: Option<String>,
        /// Do not open the standard libraries
        #[arg(long)]
        no_libs: bool,
    },

    /// Bind the library and list every resolved entry point
    Symbols {
        #[command(flatten)]
        library: LibraryArgs,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();
    init_logging(cli_config.log_filter(cli.verbose));

    match run_command(cli.command, &cli_config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_command(command: Commands, cli_config: &config::Config) -> Result<ExitCode> {
    match command {
        Commands::Run {
            script,
            library,
            mode,
            no_libs,
        } => {
            let mut settings = commands::load_settings(&library, cli_config)?;
            // Command-line flags override every configuration source
            if let Some(mode) = mode {
                settings.set_load_mode(mode)?;
            }
            if no_libs {
                settings.set_open_libs(false);
            }
            let status = commands::run::run(&script, &settings)?;
            Ok(ExitCode::from(commands::run::exit_code(status)))
        }
        Commands::Symbols { library } => {
            let settings = commands::load_settings(&library, cli_config)?;
            commands::symbols::run(&settings)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter)
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
