//! The `check` subcommand: platform gate and resolved configuration.

use std::process;

use glass_engine::{Preferences, SupervisorCfg};
use glass_worker::WorkerConfig;
use serde::Serialize;

use crate::desktop;

/// Everything `check --dump` prints.
#[derive(Serialize)]
struct Dump<'a> {
    /// Detected OS build.
    os_build: Option<u32>,
    /// Whether the build passes the platform gate.
    supported: bool,
    /// Defaults a new window would start with.
    preferences: Preferences,
    /// Worker launch settings.
    worker: &'a WorkerConfig,
    /// Supervisor timing.
    supervisor: SupervisorCfg,
}

/// Print the platform gate result; returns the process exit code.
pub fn run(config: &WorkerConfig, dump: bool) -> i32 {
    let build = desktop().os_build();
    let supported = build.is_some_and(|b| b >= config.min_os_build);
    let renderer_found = config.executable.is_file();

    if dump {
        let out = Dump {
            os_build: build,
            supported,
            preferences: Preferences::default(),
            worker: config,
            supervisor: SupervisorCfg::default(),
        };
        match serde_json::to_string_pretty(&out) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize config: {e}");
                process::exit(1);
            }
        }
    } else {
        match build {
            Some(b) => println!("OS build: {b} (minimum {})", config.min_os_build),
            None => println!("OS build: unavailable (minimum {})", config.min_os_build),
        }
        println!(
            "Renderer: {} ({})",
            config.executable.display(),
            if renderer_found { "found" } else { "missing" }
        );
        println!("{}", if supported { "supported" } else { "unsupported" });
    }
    if supported && renderer_found { 0 } else { 1 }
}
