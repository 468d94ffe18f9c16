//! Library entry for the `powerlan` tool.
//!
//! Exposes `inner_main` so the binary shim can call into the engine, and the
//! engine itself for integration tests.
#![cfg_attr(
    test,
    expect(clippy::indexing_slicing, reason = "This is not problematic in tests",)
)]

extern crate alloc;
extern crate core;

pub mod app;
pub mod cli;
pub mod config;
pub mod roster;
pub mod run;
pub mod wol;

use std::env;
use std::io;
use std::sync::Once;

use eyre::Result;
use tracing::Instrument as _;
use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use cli::{Cli, LogFormat};

static INIT_TRACING: Once = Once::new();

/// Installs the global tracing subscriber. Diagnostics go to stderr so that
/// stdout only carries the status display.
fn init_tracing(log_format: LogFormat) {
    INIT_TRACING.call_once(move || {
        let default_level = if env::var("POWERLAN_INTEGRATION_TEST").is_ok() {
            "error"
        } else {
            "info"
        };

        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
            )
            .with_timer(ChronoLocal::rfc_3339())
            .with_writer(io::stderr);

        match log_format {
            LogFormat::Compact => builder.compact().init(),
            LogFormat::Json => builder.json().init(),
            LogFormat::Pretty => builder.pretty().init(),
        }
    });
}

/// The tool's main function; can be called from a shim binary.
///
/// # Errors
///
/// Returns an error if the config or roster cannot be read or written, or if
/// the request itself is invalid.
pub async fn inner_main(invocation: Cli) -> Result<()> {
    init_tracing(invocation.log_format);

    let span = tracing::info_span!(
        "powerlan",
        pid = std::process::id(),
        version = env!("CARGO_PKG_VERSION")
    );
    run::run(invocation).instrument(span).await
}
