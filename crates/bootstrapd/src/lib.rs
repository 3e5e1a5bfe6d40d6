//! Bootstrap daemon for a peer-to-peer overlay network.
//!
//! The daemon resolves its settings from a TOML document, loads or creates a
//! persistent identity keypair, registers the configured seed peers with the
//! discovery engine, detaches into the background and then runs a
//! single-threaded poll loop that keeps the discovery engine, the TCP relay
//! and LAN discovery moving.
//!
//! The launch sequence is a linear state machine (see [`Stage`]); each stage
//! is reported to a [`LifecycleReporter`] and the first failure aborts the
//! launch with a [`LaunchError`]. The engines are reached only through the
//! traits in [`bootstrapd_net`], so the whole sequence can be driven with
//! test doubles.

mod cli;
mod health;
mod keys;
mod peers;
mod poll_loop;
mod process;
mod telemetry;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use bootstrapd_config::Settings;
use tracing::{error, info};

pub use cli::{Cli, ParseOutcome, parse_args};
pub use health::{LifecycleReporter, Stage, StructuredLifecycleReporter};
pub use keys::{IdentityError, KeyOutcome, ensure_identity};
pub use peers::{
    BootstrapPeer, PeerRejection, PeerReport, register_peers, resolve_bootstrap_peers, validate,
};
pub use poll_loop::{LAN_DISCOVERY_INTERVAL, PollLoop, TICK_SLEEP};
pub use process::{
    DaemonizeError, Daemonizer, ForkOutcome, LaunchError, Launched, SystemDaemonizer, launch,
};
pub use telemetry::{TelemetryError, TelemetryHandle, syslog_priority};

const DAEMON_TARGET: &str = env!("CARGO_PKG_NAME");

/// Daemon version as a single integer: `major * 1_000_000 + minor * 1_000 +
/// patch`. Served in bootstrap-info responses.
#[must_use]
pub fn daemon_version() -> u32 {
    let part = |text: &str| text.parse::<u32>().unwrap_or(0);
    part(env!("CARGO_PKG_VERSION_MAJOR"))
        .saturating_mul(1_000_000)
        .saturating_add(part(env!("CARGO_PKG_VERSION_MINOR")).saturating_mul(1_000))
        .saturating_add(part(env!("CARGO_PKG_VERSION_PATCH")))
}

/// Runs the daemon with the provided arguments and output handles.
///
/// Returns once the parent has forked the daemon, or on any failure. In the
/// detached child this function does not return.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E, stdout_is_terminal: bool) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match parse_args(args, stdout, stderr) {
        ParseOutcome::Run(cli) => cli,
        ParseOutcome::Exit(code) => return code,
    };
    let log_backend = cli.log_backend(stdout_is_terminal);
    if let Err(error) = telemetry::initialise(log_backend) {
        let _ = writeln!(stderr, "{error}");
        return ExitCode::FAILURE;
    }

    info!(target: DAEMON_TARGET, "running bootstrapd version {}", daemon_version());

    let settings = match Settings::load(&cli.config) {
        Ok(settings) => settings,
        Err(error) => {
            error!(target: DAEMON_TARGET, config = %cli.config, %error, "couldn't read configuration");
            return ExitCode::FAILURE;
        }
    };

    match launch(&settings, &cli.config, log_backend) {
        Ok(Launched::Parent { .. }) => ExitCode::SUCCESS,
        Ok(Launched::Daemon(poll_loop)) => poll_loop.run(),
        Err(_) => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests;
