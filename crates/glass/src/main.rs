//! Binary entrypoint for the glass host.
use std::{path::PathBuf, process, sync::Arc};

use clap::{Args, Parser, Subcommand};
use glass_protocol::{BlurType, ProtocolRevision, WindowHandle};
use glass_worker::{MINIMUM_OS_BUILD, WorkerConfig};
use logging::{self as logshared, LOG_ENV};
use tracing_subscriber::{fmt, prelude::*};

/// Health check and config dump.
mod check;
/// Host loop for one controller.
mod run;

#[derive(Parser, Debug)]
#[command(name = "glass", about = "Supervised glass effect for desktop windows", version)]
/// Command-line interface for the `glass` binary.
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,

    /// Logging controls
    #[command(flatten)]
    log: logshared::LogArgs,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Apply the effect to a window until interrupted.
    Run(RunArgs),
    /// Report whether this machine can host the renderer, then exit.
    Check {
        /// Renderer options to report on
        #[command(flatten)]
        worker: WorkerArgs,

        /// Dump the effective preferences and worker config as JSON to stdout
        #[arg(long)]
        dump: bool,
    },
}

/// How to start the renderer worker.
#[derive(Args, Debug, Clone)]
struct WorkerArgs {
    /// Path to the renderer executable
    #[arg(long, value_name = "PATH", default_value = "glass-renderer.exe")]
    renderer: PathBuf,

    /// Speak the older five-argument protocol (no text brightness)
    #[arg(long)]
    legacy_protocol: bool,

    /// Minimum OS build the renderer supports
    #[arg(long, value_name = "BUILD", default_value_t = MINIMUM_OS_BUILD)]
    min_build: u32,
}

impl WorkerArgs {
    /// Worker configuration, passing `log_spec` on to the worker.
    fn config(&self, log_spec: &str) -> WorkerConfig {
        let revision = if self.legacy_protocol {
            ProtocolRevision::Legacy
        } else {
            ProtocolRevision::Current
        };
        WorkerConfig::new(&self.renderer)
            .with_revision(revision)
            .with_min_os_build(self.min_build)
            .with_env(LOG_ENV, logshared::log_config_for_child(Some(log_spec)))
    }
}

/// Options for `glass run`.
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Renderer options
    #[command(flatten)]
    worker: WorkerArgs,

    /// Target window handle (decimal or 0x-prefixed hex)
    #[arg(long, value_name = "HANDLE")]
    window: WindowHandle,

    /// Window opacity (0-100)
    #[arg(long, default_value_t = 70, value_parser = clap::value_parser!(i32).range(0..=100))]
    opacity: i32,

    /// Background brightness (0-100)
    #[arg(long, default_value_t = 70, value_parser = clap::value_parser!(i32).range(0..=100))]
    brightness: i32,

    /// Extra brightness for text pixels
    #[arg(long, default_value_t = 70, allow_negative_numbers = true)]
    text_brightness: i32,

    /// Blur behind the window (none|medium|high)
    #[arg(long, default_value = "none")]
    blur: BlurType,

    /// Render on the CPU
    #[arg(long)]
    no_gpu: bool,

    /// Switch the host to high contrast while the effect is on
    #[arg(long)]
    high_contrast: bool,
}

/// Parse flags, set up logging and run the chosen subcommand.
fn main() {
    let cli = Cli::parse();

    // Compute final filter spec via shared helpers
    let final_spec = cli.log.spec();
    let env_filter = logshared::env_filter_from_spec(&final_spec);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().without_time())
        .try_init()
        .ok();

    let code = match &cli.command {
        Command::Check { worker, dump } => check::run(&worker.config(&final_spec), *dump),
        Command::Run(args) => run::run(args, &final_spec),
    };
    process::exit(code);
}

/// Native desktop for this platform.
fn desktop() -> Arc<dyn glass_worker::Desktop> {
    glass_worker::native_desktop()
}
