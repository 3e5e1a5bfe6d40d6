//! Structured reporting of lifecycle stage transitions.

use std::fmt;
use std::sync::Arc;

use crate::process::LaunchError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Stages of the daemon launch sequence, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Settings resolved; nothing acquired yet.
    Init,
    /// Checking for a PID file left by another instance.
    PidCheck,
    /// Binding the discovery socket.
    NetworkBind,
    /// Building the discovery engine and its identity.
    IdentityCheck,
    /// Installing the message of the day.
    MotdSet,
    /// Loading or persisting the identity keys.
    KeysManaged,
    /// Starting the TCP relay.
    RelayStarted,
    /// Registering the configured seed peers.
    PeersBootstrapped,
    /// Logging the public key.
    PublicKeyPrinted,
    /// Opening the PID file.
    PidFileOpened,
    /// Forking the background process.
    Forked,
    /// The parent recorded the child and is exiting.
    ParentExits,
    /// The child continues as the daemon.
    ChildDetaches,
    /// The child became a session leader.
    SessionDetached,
    /// The working directory was reset to the root.
    WorkdirReset,
    /// The standard streams were closed or kept for console logging.
    StreamsQuieted,
    /// Control passes to the poll loop.
    SteadyState,
}

impl Stage {
    /// Stable identifier used in structured log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::PidCheck => "pid_check",
            Self::NetworkBind => "network_bind",
            Self::IdentityCheck => "identity_check",
            Self::MotdSet => "motd_set",
            Self::KeysManaged => "keys_managed",
            Self::RelayStarted => "relay_started",
            Self::PeersBootstrapped => "peers_bootstrapped",
            Self::PublicKeyPrinted => "public_key_printed",
            Self::PidFileOpened => "pid_file_opened",
            Self::Forked => "forked",
            Self::ParentExits => "parent_exits",
            Self::ChildDetaches => "child_detaches",
            Self::SessionDetached => "session_detached",
            Self::WorkdirReset => "workdir_reset",
            Self::StreamsQuieted => "streams_quieted",
            Self::SteadyState => "steady_state",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer notified as the launch sequence advances.
pub trait LifecycleReporter {
    /// Invoked when `stage` is entered.
    fn stage_entered(&self, stage: Stage);

    /// Invoked when `stage` fails; the launch is abandoned.
    fn launch_failed(&self, stage: Stage, error: &LaunchError);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn stage_entered(&self, stage: Stage) {
        (**self).stage_entered(stage);
    }

    fn launch_failed(&self, stage: Stage, error: &LaunchError) {
        (**self).launch_failed(stage, error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn stage_entered(&self, stage: Stage) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "stage_entered",
            stage = %stage,
            "entering launch stage"
        );
    }

    fn launch_failed(&self, stage: Stage, error: &LaunchError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "launch_failed",
            stage = %stage,
            error = %error,
            "daemon launch failed"
        );
    }
}
