//! Drives the launch sequence from resolved settings to the poll loop.
//!
//! Each stage is reported to the [`LifecycleReporter`] before it runs. The
//! first failing stage aborts the sequence; nothing is rolled back because
//! nothing persistent is written until a stage has fully succeeded.

use bootstrapd_config::{LogBackend, Settings};
use bootstrapd_net::{DiscoveryEngine, Engines, IdentitySlots, IpMode, UdpEngines};
use camino::Utf8Path;
use tracing::{info, warn};

use crate::daemon_version;
use crate::health::{LifecycleReporter, Stage, StructuredLifecycleReporter};
use crate::keys::ensure_identity;
use crate::peers::resolve_bootstrap_peers;
use crate::poll_loop::PollLoop;

use super::PROCESS_TARGET;
use super::daemonizer::{Daemonizer, ForkOutcome, SystemDaemonizer};
use super::errors::LaunchError;
use super::pidfile::{self, PidFile};

const ROOT_DIRECTORY: &str = "/";

/// Poll loop type produced for an engine factory.
pub type EngineLoop<E> =
    PollLoop<<E as Engines>::Discovery, <E as Engines>::Relay, <E as Engines>::Broadcaster>;

/// How the launch sequence ended for this process.
pub enum Launched<E: Engines> {
    /// This is the original process; the child was recorded in the PID file.
    Parent {
        /// Process id of the detached child.
        child: i32,
    },
    /// This is the detached daemon, ready to enter the poll loop.
    Daemon(EngineLoop<E>),
}

impl<E: Engines> std::fmt::Debug for Launched<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parent { child } => f.debug_struct("Parent").field("child", child).finish(),
            Self::Daemon(_) => f.write_str("Daemon"),
        }
    }
}

/// Inputs read by the launch sequence.
pub(crate) struct LaunchInputs<'a> {
    pub(crate) settings: &'a Settings,
    pub(crate) config_path: &'a Utf8Path,
    pub(crate) log_backend: LogBackend,
}

/// Process-level collaborators needed to detach the daemon.
pub(crate) struct ProcessControl<Dz> {
    pub(crate) daemonizer: Dz,
}

/// Service dependencies required to construct the engines.
pub(crate) struct ServiceDeps<E, R> {
    pub(crate) engines: E,
    pub(crate) reporter: R,
}

/// Collaborators required to launch the daemon.
pub(crate) struct LaunchPlan<'a, E, Dz, R> {
    pub(crate) inputs: LaunchInputs<'a>,
    pub(crate) process: ProcessControl<Dz>,
    pub(crate) services: ServiceDeps<E, R>,
}

/// Launches the daemon using the production collaborators.
pub fn launch(
    settings: &Settings,
    config_path: &Utf8Path,
    log_backend: LogBackend,
) -> Result<Launched<UdpEngines>, LaunchError> {
    let plan = LaunchPlan {
        inputs: LaunchInputs {
            settings,
            config_path,
            log_backend,
        },
        process: ProcessControl {
            daemonizer: SystemDaemonizer::new(),
        },
        services: ServiceDeps {
            engines: UdpEngines,
            reporter: StructuredLifecycleReporter::new(),
        },
    };
    launch_with(plan)
}

/// Launches the daemon with injected collaborators.
pub(crate) fn launch_with<E, Dz, R>(
    plan: LaunchPlan<'_, E, Dz, R>,
) -> Result<Launched<E>, LaunchError>
where
    E: Engines,
    Dz: Daemonizer,
    R: LifecycleReporter,
{
    let LaunchPlan {
        inputs,
        process,
        services,
    } = plan;
    let mut sequence = LaunchSequence {
        inputs,
        daemonizer: process.daemonizer,
        engines: services.engines,
        reporter: services.reporter,
        stage: Stage::Init,
    };
    sequence.run().inspect_err(|error| {
        sequence.reporter.launch_failed(sequence.stage, error);
    })
}

struct LaunchSequence<'a, E, Dz, R> {
    inputs: LaunchInputs<'a>,
    daemonizer: Dz,
    engines: E,
    reporter: R,
    stage: Stage,
}

impl<E, Dz, R> LaunchSequence<'_, E, Dz, R>
where
    E: Engines,
    Dz: Daemonizer,
    R: LifecycleReporter,
{
    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.reporter.stage_entered(stage);
    }

    fn run(&mut self) -> Result<Launched<E>, LaunchError> {
        let settings = self.inputs.settings;
        self.enter(Stage::Init);

        self.enter(Stage::PidCheck);
        pidfile::warn_if_present(&settings.pid_file_path);

        self.enter(Stage::NetworkBind);
        let (network, mode) = self.bind_network()?;

        self.enter(Stage::IdentityCheck);
        let mut discovery = self
            .engines
            .discovery(network)
            .map_err(|source| LaunchError::Discovery { source })?;

        if settings.motd.enabled {
            self.enter(Stage::MotdSet);
            discovery
                .set_motd(daemon_version(), &settings.motd.text)
                .map_err(|source| LaunchError::Motd { source })?;
            info!(target: PROCESS_TARGET, "set MOTD successfully");
        }

        self.enter(Stage::KeysManaged);
        ensure_identity(&settings.keys_file_path, &mut discovery)?;

        let relay = if settings.relay.enabled {
            self.enter(Stage::RelayStarted);
            if settings.relay.ports.is_empty() {
                return Err(LaunchError::NoRelayPorts);
            }
            let relay = self
                .engines
                .start_relay(mode, &settings.relay.ports, discovery.keypair())
                .map_err(|source| LaunchError::Relay { source })?;
            info!(target: PROCESS_TARGET, "initialized TCP relay");
            Some(relay)
        } else {
            None
        };

        self.enter(Stage::PeersBootstrapped);
        let report =
            resolve_bootstrap_peers(self.inputs.config_path, mode.is_ipv6(), &mut discovery)?;
        info!(
            target: PROCESS_TARGET,
            added = report.added,
            skipped = report.skipped,
            "bootstrapped from configured nodes"
        );

        self.enter(Stage::PublicKeyPrinted);
        info!(
            target: PROCESS_TARGET,
            public_key = %discovery.keypair().public_key(),
            "public key"
        );

        self.enter(Stage::PidFileOpened);
        let pid_file = PidFile::open(&settings.pid_file_path)?;

        self.enter(Stage::Forked);
        match self.daemonizer.fork()? {
            ForkOutcome::Parent { child } => {
                self.enter(Stage::ParentExits);
                if let Err(error) = pid_file.write_pid(child) {
                    warn!(target: PROCESS_TARGET, child, %error, "couldn't record the child pid");
                }
                return Ok(Launched::Parent { child });
            }
            ForkOutcome::Child => {
                drop(pid_file);
                self.enter(Stage::ChildDetaches);
            }
        }

        self.enter(Stage::SessionDetached);
        self.daemonizer.new_session()?;

        self.enter(Stage::WorkdirReset);
        self.daemonizer.change_workdir(Utf8Path::new(ROOT_DIRECTORY))?;

        self.enter(Stage::StreamsQuieted);
        if !self.inputs.log_backend.uses_console() {
            self.daemonizer.close_standard_streams()?;
        }

        self.enter(Stage::SteadyState);
        let broadcaster = if settings.enable_lan_discovery {
            let broadcaster = self
                .engines
                .lan_broadcaster(&discovery, settings.port)
                .map_err(|source| LaunchError::LanDiscovery { source })?;
            info!(target: PROCESS_TARGET, "initialized LAN discovery");
            Some(broadcaster)
        } else {
            None
        };

        Ok(Launched::Daemon(PollLoop::new(discovery, relay, broadcaster)))
    }

    /// Binds under the configured family, retrying once under IPv4 when an
    /// IPv6 bind fails and fallback is enabled.
    fn bind_network(&self) -> Result<(E::Network, IpMode), LaunchError> {
        let settings = self.inputs.settings;
        let port = settings.port;
        let mode = IpMode::from_ipv6_flag(settings.enable_ipv6);
        match self.engines.bind_network(mode, port) {
            Ok(network) => Ok((network, mode)),
            Err(error) if mode.is_ipv6() && settings.enable_ipv4_fallback => {
                warn!(
                    target: PROCESS_TARGET,
                    port,
                    %error,
                    "couldn't initialize IPv6 networking, falling back to IPv4"
                );
                self.engines
                    .bind_network(IpMode::V4, port)
                    .map(|network| (network, IpMode::V4))
                    .map_err(|source| LaunchError::Bind {
                        mode: IpMode::V4,
                        port,
                        source,
                    })
            }
            Err(source) => Err(LaunchError::Bind { mode, port, source }),
        }
    }
}
