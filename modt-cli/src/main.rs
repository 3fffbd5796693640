//! modt CLI - Command-line tool for the New Matter MOD-t 3D printer.
//!
//! ## Features
//!
//! - Send g-code print jobs
//! - Query printer, firmware and wifi status
//! - Load and unload filament
//! - Switch the printer into DFU mode
//! - Shell completion generation
//! - Environment variable and config file support

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use console::style;
use env_logger::Env;
use log::debug;
use modt::{Command, Printer, UsbConfig};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

mod commands;
mod config;

use commands::gcode::UploadOptions;
use config::Config;

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Set by the Ctrl-C handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Default seconds between status polls.
const DEFAULT_STATUS_INTERVAL_SECS: u64 = 5;

/// Exit code for a run cancelled with Ctrl-C.
const EXIT_CANCELLED: i32 = 130;

/// Check if emoji/animations should be used (TTY and colors enabled).
fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// Whether Ctrl-C was pressed.
fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Errors raised by the CLI itself, mapped to dedicated exit codes.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// Invalid combination of arguments.
    #[error("{0}")]
    Usage(String),
    /// The user cancelled the operation.
    #[error("{0}")]
    Cancelled(String),
}

/// modt - Talk to a New Matter MOD-t 3D printer over USB.
///
/// After every printer subcommand the printer status is printed in a loop
/// until Ctrl-C (or once with --no-status-loop).
///
/// Environment variables:
///   MODT_NO_STATUS_LOOP   - Print the status only once
///   MODT_STATUS_INTERVAL  - Seconds between status polls (default: 5)
///   MODT_TIMEOUT_MS       - USB transfer timeout in milliseconds
#[derive(Parser)]
#[command(name = "modt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Do not print the printer status in a loop.
    #[arg(long, global = true, env = "MODT_NO_STATUS_LOOP")]
    no_status_loop: bool,

    /// Seconds between status polls.
    #[arg(long, global = true, value_name = "SECS", env = "MODT_STATUS_INTERVAL")]
    status_interval: Option<u64>,

    /// USB transfer timeout in milliseconds.
    #[arg(long, global = true, value_name = "MS", env = "MODT_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Get the bio firmware version.
    #[command(name = "bio_version")]
    BioVersion,

    /// Enter DFU mode.
    #[command(name = "enter_dfu")]
    EnterDfu,

    /// Enter DFU mode for a firmware update (flashing itself is not implemented).
    #[command(name = "firmware_update")]
    FirmwareUpdate {
        /// DFU file containing the firmware.
        file: PathBuf,
    },

    /// Load filament.
    #[command(name = "load_filament")]
    LoadFilament,

    /// Send the contents of a g-code file to the printer.
    #[command(name = "send_gcode")]
    SendGcode {
        /// Path to the g-code file.
        file: PathBuf,

        /// Print submitted blocks to stdout.
        #[arg(long)]
        print_blocks: bool,

        /// Print the printer status interleaved every 20 blocks.
        #[arg(long)]
        print_status: bool,

        /// Job id announced to the printer.
        #[arg(long, value_name = "ID")]
        job_id: Option<String>,
    },

    /// Retrieve the printer status.
    Status,

    /// Unload filament.
    #[command(name = "unload_filament")]
    UnloadFilament,

    /// Get the wifi client status.
    #[command(name = "wifi_status")]
    WifiStatus,

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (detected from $SHELL if not specified).
        #[arg(value_enum)]
        shell: Option<Shell>,
    },
}

impl Commands {
    /// Catalog command sent by simple subcommands.
    fn catalog_command(&self) -> Option<Command> {
        match self {
            Self::BioVersion => Some(Command::BioVersion),
            Self::EnterDfu => Some(Command::EnterDfu),
            Self::LoadFilament => Some(Command::LoadFilament),
            Self::UnloadFilament => Some(Command::UnloadFilament),
            Self::WifiStatus => Some(Command::WifiStatus),
            Self::FirmwareUpdate { .. }
            | Self::SendGcode { .. }
            | Self::Status
            | Self::Completions { .. } => None,
        }
    }
}

/// Effective settings after merging CLI flags, env vars and config files.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    timeout: Duration,
    status_loop: bool,
    status_interval: Duration,
    upload: UploadOptions,
    job_id: Option<String>,
}

impl Settings {
    fn resolve(cli: &Cli, config: &Config) -> Result<Self> {
        let timeout = cli
            .timeout_ms
            .or(config.device.timeout_ms)
            .map_or(modt::transport::DEFAULT_TIMEOUT, Duration::from_millis);

        let status_loop = !cli.no_status_loop && config.status.repeat.unwrap_or(true);
        let interval_secs = cli
            .status_interval
            .or(config.status.interval_secs)
            .unwrap_or(DEFAULT_STATUS_INTERVAL_SECS);
        if status_loop && interval_secs == 0 {
            return Err(CliError::Usage(
                "--status-interval must be at least 1 second when looping".to_string(),
            )
            .into());
        }

        let (print_blocks, print_status, job_id) = match &cli.command {
            Commands::SendGcode {
                print_blocks,
                print_status,
                job_id,
                ..
            } => (
                *print_blocks || config.upload.print_blocks,
                *print_status || config.upload.print_status,
                job_id.clone().or_else(|| config.upload.job_id.clone()),
            ),
            _ => (config.upload.print_blocks, config.upload.print_status, None),
        };

        Ok(Self {
            timeout,
            status_loop,
            status_interval: Duration::from_secs(interval_secs),
            upload: UploadOptions {
                print_blocks,
                print_status,
                quiet: cli.quiet,
            },
            job_id,
        })
    }
}

fn main() {
    // --- NO_COLOR and TTY detection ---
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!(
        "modt v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    if let Err(err) = run(&cli) {
        let code = exit_code(&err);
        if code == EXIT_CANCELLED {
            if !cli.quiet {
                eprintln!("{} {err}", style("Cancelled:").yellow().bold());
            }
        } else {
            eprintln!("{} {err:#}", style("Error:").red().bold());
        }
        std::process::exit(code);
    }
}

/// Execute the parsed command line.
fn run(cli: &Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        return commands::completions::cmd_completions(*shell);
    }

    install_interrupt_handler();

    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };
    let settings = Settings::resolve(cli, &config)?;
    debug!("Effective settings: {settings:?}");

    // Read the job before touching the printer
    let job = match &cli.command {
        Commands::SendGcode { file, .. } => Some(commands::gcode::load_job(
            file,
            settings.job_id.as_deref(),
        )?),
        _ => None,
    };
    ensure_not_interrupted()?;

    let mut printer = Printer::open(&UsbConfig::default().with_timeout(settings.timeout))
        .context("Could not connect to the printer")?;
    ensure_not_interrupted()?;

    if let Some(command) = cli.command.catalog_command() {
        commands::device::cmd_send(&mut printer, command)?;
    } else if let Some(job) = &job {
        commands::gcode::cmd_send_gcode(&mut printer, job, settings.upload)?;
    } else if let Commands::FirmwareUpdate { file } = &cli.command {
        commands::device::cmd_firmware_update(&mut printer, file, cli.quiet)?;
    }

    commands::device::run_status_loop(
        &mut printer,
        settings.status_loop,
        settings.status_interval,
    )?;
    Ok(())
}

/// Register the Ctrl-C handler and hook it into the library's long loops.
fn install_interrupt_handler() {
    let result = ctrlc::set_handler(|| {
        // Second Ctrl-C: stop waiting for the current transfer
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            std::process::exit(EXIT_CANCELLED);
        }
    });
    if let Err(err) = result {
        debug!("Could not install Ctrl-C handler: {err}");
    }
    modt::set_interrupt_checker(was_interrupted);
}

fn ensure_not_interrupted() -> Result<()> {
    if was_interrupted() {
        Err(CliError::Cancelled("interrupted by user".to_string()).into())
    } else {
        Ok(())
    }
}

/// Map an error to the process exit code.
fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(cli_err) = cause.downcast_ref::<CliError>() {
            return match cli_err {
                CliError::Usage(_) => 2,
                CliError::Cancelled(_) => EXIT_CANCELLED,
            };
        }
        if let Some(modt::Error::Interrupted) = cause.downcast_ref::<modt::Error>() {
            return EXIT_CANCELLED;
        }
    }
    1
}
