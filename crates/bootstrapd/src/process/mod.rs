//! Launch sequencing: from resolved settings to a detached daemon.

pub(crate) mod daemonizer;
mod errors;
pub(crate) mod launch;
mod pidfile;

pub use daemonizer::{DaemonizeError, Daemonizer, ForkOutcome, SystemDaemonizer};
pub use errors::LaunchError;
pub use launch::{Launched, launch};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
