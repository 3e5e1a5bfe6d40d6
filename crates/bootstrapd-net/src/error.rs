//! Errors raised by the network engines.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::network::IpMode;

/// Errors raised by the network engines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The discovery socket could not be bound.
    #[error("failed to bind {mode} socket on port {port}: {source}")]
    Bind {
        /// Address family requested.
        mode: IpMode,
        /// Port requested.
        port: u16,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A socket option or clone operation failed after binding.
    #[error("failed to configure socket: {source}")]
    Socket {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A peer address did not resolve to a usable socket address.
    #[error("could not resolve '{address}'")]
    Resolve {
        /// Address as configured.
        address: String,
        /// Lookup failure, when the resolver reported one.
        #[source]
        source: Option<io::Error>,
    },
    /// The message of the day does not fit the info response.
    #[error("message of the day is {length} bytes, the limit is {limit}")]
    MotdTooLong {
        /// Length including the terminator.
        length: usize,
        /// Maximum length including the terminator.
        limit: usize,
    },
    /// No relay listener could be bound.
    #[error("no TCP relay listener could be bound on ports {ports:?}")]
    RelayUnavailable {
        /// Ports attempted.
        ports: Vec<u16>,
    },
    /// Every broadcast target rejected the announcement.
    #[error("LAN announcement reached none of {attempted} targets: {source}")]
    Broadcast {
        /// Number of targets attempted.
        attempted: usize,
        /// Last send error.
        #[source]
        source: io::Error,
    },
    /// Sending a datagram failed.
    #[error("failed to send to {target}: {source}")]
    Send {
        /// Destination address.
        target: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
