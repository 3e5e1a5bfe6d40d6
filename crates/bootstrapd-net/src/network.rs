//! Non-blocking UDP socket shared by discovery and LAN broadcast.

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use crate::error::EngineError;

const NETWORK_TARGET: &str = "bootstrapd_net::network";

/// Address family a socket is bound under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpMode {
    /// IPv4 only.
    V4,
    /// IPv6, accepting IPv4 through mapped addresses.
    V6,
}

impl IpMode {
    /// Maps the `enable_ipv6` setting to a mode.
    #[must_use]
    pub const fn from_ipv6_flag(enable_ipv6: bool) -> Self {
        if enable_ipv6 { Self::V6 } else { Self::V4 }
    }

    /// Whether this mode is IPv6.
    #[must_use]
    pub const fn is_ipv6(self) -> bool {
        matches!(self, Self::V6)
    }

    /// Wildcard address listening on `port` under this mode.
    #[must_use]
    pub fn unspecified(self, port: u16) -> SocketAddr {
        match self {
            Self::V4 => SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            Self::V6 => SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
        }
    }

    /// Creates a non-blocking socket of type `ty` bound to the wildcard
    /// address on `port`.
    pub(crate) fn bind_socket(self, ty: Type, protocol: Protocol, port: u16) -> io::Result<Socket> {
        let domain = match self {
            Self::V4 => Domain::IPV4,
            Self::V6 => Domain::IPV6,
        };
        let socket = Socket::new(domain, ty, Some(protocol))?;
        if self.is_ipv6() {
            socket.set_only_v6(false)?;
        }
        socket.set_nonblocking(true)?;
        socket.bind(&self.unspecified(port).into())?;
        Ok(socket)
    }
}

impl fmt::Display for IpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => f.write_str("IPv4"),
            Self::V6 => f.write_str("IPv6"),
        }
    }
}

/// Bound, non-blocking UDP socket.
#[derive(Debug)]
pub struct NetworkCore {
    socket: UdpSocket,
    mode: IpMode,
    port: u16,
}

impl NetworkCore {
    /// Binds the wildcard address on `port` under `mode`.
    pub fn bind(mode: IpMode, port: u16) -> Result<Self, EngineError> {
        let socket = mode
            .bind_socket(Type::DGRAM, Protocol::UDP, port)
            .map_err(|source| EngineError::Bind { mode, port, source })?;
        socket
            .set_broadcast(true)
            .map_err(|source| EngineError::Socket { source })?;
        let socket: UdpSocket = socket.into();
        let bound_port = socket.local_addr().map_or(port, |address| address.port());
        debug!(target: NETWORK_TARGET, %mode, port = bound_port, "UDP socket bound");
        Ok(Self {
            socket,
            mode,
            port: bound_port,
        })
    }

    /// Address family of the socket.
    #[must_use]
    pub const fn mode(&self) -> IpMode {
        self.mode
    }

    /// Port the socket is bound to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Clones the underlying socket handle.
    pub fn try_clone_socket(&self) -> Result<UdpSocket, EngineError> {
        self.socket
            .try_clone()
            .map_err(|source| EngineError::Socket { source })
    }

    /// Sends a datagram, mapping IPv4 targets when bound dual-stack.
    pub fn send_to(&self, payload: &[u8], target: SocketAddr) -> Result<(), EngineError> {
        send_datagram(&self.socket, self.mode, payload, target)
    }

    /// Receives one queued datagram, or `None` when the queue is empty.
    pub fn try_recv(&self, buffer: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buffer) {
            Ok((length, from)) => Ok(Some((length, canonical(from)))),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }
}

pub(crate) fn send_datagram(
    socket: &UdpSocket,
    mode: IpMode,
    payload: &[u8],
    target: SocketAddr,
) -> Result<(), EngineError> {
    let destination = match (mode, target) {
        (IpMode::V6, SocketAddr::V4(v4)) => {
            SocketAddr::V6(SocketAddrV6::new(v4.ip().to_ipv6_mapped(), v4.port(), 0, 0))
        }
        _ => target,
    };
    socket
        .send_to(payload, destination)
        .map(drop)
        .map_err(|source| EngineError::Send { target, source })
}

/// Folds IPv4-mapped IPv6 addresses back to plain IPv4.
pub(crate) fn canonical(address: SocketAddr) -> SocketAddr {
    match address {
        SocketAddr::V6(v6) => match v6.ip().to_ipv4_mapped() {
            Some(v4) => SocketAddr::from((v4, v6.port())),
            None => address,
        },
        SocketAddr::V4(_) => address,
    }
}
