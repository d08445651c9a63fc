//! Command-line interface definitions for the `slipway` binary.
//!
//! The parser lives here so both the binary and the build script can reuse
//! it when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `slipway` binary.
#[derive(Debug, Parser)]
#[command(
    name = "slipway",
    about = "Provision short-lived Heroku apps for bot sessions and reclaim them after a day",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Serve the deploy API and run the background sweeper.
    #[command(
        name = "serve",
        about = "Serve the deploy API and run the background sweeper"
    )]
    Serve,
    /// Run a single reclamation pass and print its summary.
    #[command(name = "sweep", about = "Run a single reclamation pass and print its summary")]
    Sweep,
}
