//! Logging initialization.
//!
//! Events go to stderr; stdout carries the command's JSON output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber.
///
/// `verbose` raises this crate's level from INFO to DEBUG; `json_format`
/// switches to one JSON object per event. `RUST_LOG` overrides both levels.
pub fn init(verbose: bool, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).with_ansi(true))
            .init();
    }
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,imgdescgen=debug"
    } else {
        "warn,imgdescgen=info"
    }
}
