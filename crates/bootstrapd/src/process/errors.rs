//! Defines the unified error surface for daemon launch.

use std::io;

use bootstrapd_config::DocumentError;
use bootstrapd_net::{EngineError, IpMode};
use camino::Utf8PathBuf;
use thiserror::Error;

use crate::keys::IdentityError;

use super::daemonizer::DaemonizeError;

/// Errors that abort the launch sequence. Each maps to exit code 1.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The discovery socket could not be bound, including after fallback.
    #[error("failed to bind {mode} discovery socket on port {port}: {source}")]
    Bind {
        /// Address family of the last attempt.
        mode: IpMode,
        /// Requested port.
        port: u16,
        /// Engine error from the last attempt.
        #[source]
        source: EngineError,
    },
    /// The discovery engine could not be constructed.
    #[error("failed to initialise the discovery engine: {source}")]
    Discovery {
        /// Engine error.
        #[source]
        source: EngineError,
    },
    /// The message of the day was rejected.
    #[error("failed to set the message of the day: {source}")]
    Motd {
        /// Engine error.
        #[source]
        source: EngineError,
    },
    /// The identity keys could not be loaded or saved.
    #[error("failed to manage identity keys: {source}")]
    Identity {
        /// Identity store error.
        #[source]
        source: IdentityError,
    },
    /// Relay is enabled but no port survived validation.
    #[error("TCP relay is enabled but no valid relay ports are configured")]
    NoRelayPorts,
    /// The relay engine could not be started.
    #[error("failed to start the TCP relay: {source}")]
    Relay {
        /// Engine error.
        #[source]
        source: EngineError,
    },
    /// The configuration could not be reloaded for the seed peer list.
    #[error("failed to read bootstrap nodes: {source}")]
    Peers {
        /// Document error.
        #[source]
        source: DocumentError,
    },
    /// The PID file could not be opened for appending.
    #[error("failed to open pid file '{path}': {source}")]
    PidOpen {
        /// PID file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The child PID could not be written.
    #[error("failed to write pid file '{path}': {source}")]
    PidWrite {
        /// PID file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Detaching from the terminal failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Daemoniser error.
        #[source]
        source: DaemonizeError,
    },
    /// The LAN discovery broadcaster could not be created.
    #[error("failed to initialise LAN discovery: {source}")]
    LanDiscovery {
        /// Engine error.
        #[source]
        source: EngineError,
    },
}

impl From<IdentityError> for LaunchError {
    fn from(source: IdentityError) -> Self {
        Self::Identity { source }
    }
}

impl From<DocumentError> for LaunchError {
    fn from(source: DocumentError) -> Self {
        Self::Peers { source }
    }
}

impl From<DaemonizeError> for LaunchError {
    fn from(source: DaemonizeError) -> Self {
        Self::Daemonize { source }
    }
}
