//! Gemini workload logger.
//!
//! A typed note is wrapped in an instruction template, rephrased by a
//! [`style_provider::StyleProvider`] into a console-style status line, stamped
//! with the local time and appended to the selected log file.
//!
//! # Startup selection
//! - `WORKLOAD_LOGGER_PROVIDER` (or `--provider`) picks `gemini` (default) or `mock`.
//! - `GOOGLE_API_KEY` is required by the gemini provider.
//! - `WORKLOAD_LOGGER_MODEL` (or `--model`) takes one model id or a comma-separated list.
//!
//! The console loop applies every state change on one thread; provider runs
//! happen on a worker that reports back through [`runtime::RuntimeController`].

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod oneshot;
pub mod providers;
pub mod runtime;
pub mod session;
pub mod transformer;
