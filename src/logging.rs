//! Structured logging initialization for the fleet CLI.
//!
//! Toolchain transcript lines are logged at `trace`, device commands at
//! `debug`, run milestones at `info`. Without `-v` only warnings show, so
//! log lines do not tear the progress bar.

use std::io::{self, IsTerminal};

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    /// JSON lines for scripts.
    Json,
    /// Colored output for an interactive terminal.
    Pretty,
    /// Plain compact lines when stderr is redirected.
    Compact,
}

impl LogStyle {
    /// Pick the style from the output mode and whether stderr is a TTY.
    #[must_use]
    pub const fn select(robot_mode: bool, stderr_is_terminal: bool) -> Self {
        if robot_mode {
            Self::Json
        } else if stderr_is_terminal {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

/// Default filter directive for a verbosity level.
#[must_use]
pub const fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "fleet=error";
    }
    match verbose {
        0 => "fleet=warn",
        1 => "fleet=info",
        2 => "fleet=debug",
        _ => "fleet=trace",
    }
}

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// `RUST_LOG` overrides the verbosity-derived filter
/// (e.g. `fleet::toolchain=trace`).
pub fn init_logging(robot_mode: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let base = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(io::stderr);

    let registry = tracing_subscriber::registry().with(filter);
    // try_init: tests may have installed a subscriber already
    let _ = match LogStyle::select(robot_mode, io::stderr().is_terminal()) {
        LogStyle::Json => registry.with(base.json().with_target(true)).try_init(),
        LogStyle::Pretty => registry.with(base.with_target(false)).try_init(),
        LogStyle::Compact => registry
            .with(base.with_ansi(false).with_target(false).compact())
            .try_init(),
    };
}
