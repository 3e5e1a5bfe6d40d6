//! Log backend selection.

use clap::ValueEnum;
use strum::{Display, EnumString};

/// Destinations for daemon log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display, ValueEnum)]
#[strum(serialize_all = "snake_case")]
pub enum LogBackend {
    /// Messages go to the system logger.
    #[default]
    Syslog,
    /// Messages go to stdout, warnings and errors to stderr.
    Stdout,
}

impl LogBackend {
    /// Picks the backend used when none is requested explicitly.
    ///
    /// A daemon launched from an interactive terminal logs to the console so
    /// the operator sees startup progress; otherwise it logs to syslog.
    #[must_use]
    pub fn detect(stdout_is_terminal: bool) -> Self {
        if stdout_is_terminal {
            Self::Stdout
        } else {
            Self::Syslog
        }
    }

    /// Whether the standard streams must stay open after daemonising.
    #[must_use]
    pub fn uses_console(self) -> bool {
        matches!(self, Self::Stdout)
    }
}
