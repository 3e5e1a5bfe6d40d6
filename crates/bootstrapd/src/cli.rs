//! Command-line surface of the daemon.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use bootstrapd_config::LogBackend;
use camino::Utf8PathBuf;
use clap::error::ErrorKind;
use clap::{Command, CommandFactory, FromArgMatches, Parser};

use crate::daemon_version;

/// Arguments accepted by `bootstrapd`.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "bootstrapd",
    about = "Seed node that helps peers join the network."
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Utf8PathBuf,
    /// Where log records are sent. Defaults to stdout on a terminal and
    /// syslog otherwise.
    #[arg(long = "log-backend", value_enum, value_name = "BACKEND")]
    pub log_backend: Option<LogBackend>,
}

impl Cli {
    /// Backend selected on the command line, or the detected default.
    #[must_use]
    pub fn log_backend(&self, stdout_is_terminal: bool) -> LogBackend {
        self.log_backend
            .unwrap_or_else(|| LogBackend::detect(stdout_is_terminal))
    }
}

/// Command definition with `--version` reporting [`daemon_version`].
fn command() -> Command {
    Cli::command().version(daemon_version().to_string())
}

/// Result of parsing the command line.
#[derive(Debug)]
pub enum ParseOutcome {
    /// Arguments were valid; start the daemon.
    Run(Cli),
    /// Help, version or a usage error was printed; exit with the code.
    Exit(ExitCode),
}

/// Parses `args`, printing help, version or usage errors to the supplied
/// writers.
pub fn parse_args<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ParseOutcome
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let parsed = command()
        .try_get_matches_from(args)
        .and_then(|matches| Cli::from_arg_matches(&matches));
    match parsed {
        Ok(cli) => ParseOutcome::Run(cli),
        Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = write!(stdout, "{}", error.render());
            ParseOutcome::Exit(ExitCode::SUCCESS)
        }
        Err(error) => {
            let _ = write!(stderr, "{}", error.render());
            let _ = writeln!(stderr);
            let _ = write!(stderr, "{}", command().render_help());
            ParseOutcome::Exit(ExitCode::FAILURE)
        }
    }
}
