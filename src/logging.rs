//! Diagnostic tracing setup.
//!
//! The console owns stdout, so diagnostics go either to a trace file or to
//! stderr at `warn`. `RUST_LOG` overrides the level in both cases.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const FILE_DEFAULT_DIRECTIVE: &str = "info";
const STDERR_DEFAULT_DIRECTIVE: &str = "warn";

pub fn init_tracing(trace_log: Option<&Path>) -> io::Result<()> {
    let result = match trace_log {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .with(env_filter(FILE_DEFAULT_DIRECTIVE))
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .with(env_filter(STDERR_DEFAULT_DIRECTIVE))
            .try_init(),
    };

    result.map_err(io::Error::other)
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}
