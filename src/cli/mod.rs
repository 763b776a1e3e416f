//! Command Line Interface (CLI) layer for s2rgb.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for the `fetch` and `compose`
//! subcommands. It wires user-provided options to the underlying library
//! functionality exposed via `s2rgb::api`.
//!
//! If you are embedding s2rgb into another application, prefer using the
//! high-level `s2rgb::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
