//! Entry point for the bootstrap daemon.
//!
//! Delegates to [`bootstrapd::run`], which parses arguments, installs
//! telemetry, resolves configuration and hands over to the lifecycle
//! controller. A successful parent fork returns here with a zero exit code;
//! the detached child never returns.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

fn main() -> ExitCode {
    let stdout_is_terminal = io::stdout().is_terminal();
    bootstrapd::run(
        std::env::args_os(),
        &mut io::stdout(),
        &mut io::stderr(),
        stdout_is_terminal,
    )
}
