#![warn(missing_docs)]

//! Log flag handling shared by the glass binaries.
//!
//! Binaries flatten [`LogArgs`] into their CLI, turn it into a filter
//! directive with [`compute_spec`], and pass the same directive to renderer
//! workers through [`log_config_for_child`].

use std::env;

use clap::Args;
use tracing_subscriber::EnvFilter;

/// Environment variable carrying the filter directive.
pub const LOG_ENV: &str = "RUST_LOG";

/// Tracing targets of the workspace crates.
const OUR_CRATES: &[&str] = &[
    "glass",
    "glass_engine",
    "glass_worker",
    "glass_protocol",
    "logging",
];

/// Log verbosity flags.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Trace-level output from the glass crates
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Debug-level output from the glass crates
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Level applied to every glass crate (error|warn|info|debug|trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Raw tracing filter directive, taking precedence over the other flags,
    /// e.g. "glass_engine=trace,glass_worker=debug"
    #[arg(long, value_name = "DIRECTIVE")]
    pub log_filter: Option<String>,
}

impl LogArgs {
    /// Final filter directive for these flags.
    pub fn spec(&self) -> String {
        compute_spec(self)
    }
}

/// Crate targets that make up the workspace's own logs.
pub fn our_crates() -> &'static [&'static str] {
    OUR_CRATES
}

/// Directive giving every crate in [`our_crates`] the same `level`.
pub fn level_spec_for(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    OUR_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Resolve the filter directive. First match wins:
/// `--log-filter`, `--trace`, `--debug`, `--log-level`, `RUST_LOG`, then
/// `info` for our crates.
pub fn compute_spec(args: &LogArgs) -> String {
    match args {
        LogArgs {
            log_filter: Some(raw),
            ..
        } => raw.clone(),
        LogArgs { trace: true, .. } => level_spec_for("trace"),
        LogArgs { debug: true, .. } => level_spec_for("debug"),
        LogArgs {
            log_level: Some(level),
            ..
        } => level_spec_for(level),
        _ => env::var(LOG_ENV).unwrap_or_else(|_| level_spec_for("info")),
    }
}

/// Build the subscriber filter for a directive.
pub fn env_filter_from_spec(spec: &str) -> EnvFilter {
    EnvFilter::new(spec)
}

/// `RUST_LOG` value for renderer workers: `spec` when given, otherwise the
/// inherited environment, otherwise `info` for our crates.
pub fn log_config_for_child(spec: Option<&str>) -> String {
    match spec {
        Some(s) => s.to_string(),
        None => env::var(LOG_ENV).unwrap_or_else(|_| level_spec_for("info")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_spec_covers_every_crate() {
        let spec = level_spec_for("DEBUG");
        for krate in our_crates() {
            assert!(spec.contains(&format!("{krate}=debug")), "{spec}");
        }
    }

    #[test]
    fn explicit_filter_wins() {
        let args = LogArgs {
            log_level: Some("warn".into()),
            log_filter: Some("glass_engine=trace".into()),
            ..LogArgs::default()
        };
        assert_eq!(compute_spec(&args), "glass_engine=trace");
    }

    #[test]
    fn flags_are_crate_scoped() {
        let trace = LogArgs {
            trace: true,
            ..LogArgs::default()
        };
        assert_eq!(trace.spec(), level_spec_for("trace"));
        let warn = LogArgs {
            log_level: Some("WARN".into()),
            ..LogArgs::default()
        };
        assert_eq!(warn.spec(), level_spec_for("warn"));
    }

    #[test]
    fn child_spec_prefers_explicit_value() {
        assert_eq!(log_config_for_child(Some("glass=warn")), "glass=warn");
    }
}
