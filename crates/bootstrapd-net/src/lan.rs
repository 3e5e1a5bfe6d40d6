//! Local network announcements.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use tracing::trace;

use crate::error::EngineError;
use crate::identity::PublicKey;
use crate::network::{IpMode, NetworkCore, send_datagram};
use crate::packets::{self, PACKET_LAN_ANNOUNCE, PRESENCE_LENGTH};
use crate::LanBroadcaster;

const LAN_TARGET: &str = "bootstrapd_net::lan";

/// IPv6 all-nodes link-local multicast group.
const ALL_NODES: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1);

/// Announces this node's public key to the local segment.
#[derive(Debug)]
pub struct UdpLanBroadcaster {
    socket: UdpSocket,
    mode: IpMode,
    targets: Vec<SocketAddr>,
    announcement: [u8; PRESENCE_LENGTH],
}

impl UdpLanBroadcaster {
    /// Shares the discovery socket and targets `port` on the local segment.
    pub fn new(network: &NetworkCore, public_key: &PublicKey, port: u16) -> Result<Self, EngineError> {
        let mode = network.mode();
        Ok(Self {
            socket: network.try_clone_socket()?,
            mode,
            targets: broadcast_targets(mode, port),
            announcement: packets::presence(PACKET_LAN_ANNOUNCE, public_key),
        })
    }

    /// Addresses each broadcast is sent to.
    #[must_use]
    pub fn targets(&self) -> &[SocketAddr] {
        &self.targets
    }
}

impl LanBroadcaster for UdpLanBroadcaster {
    fn broadcast(&mut self) -> Result<usize, EngineError> {
        let mut delivered = 0;
        let mut last_error = None;
        for &target in &self.targets {
            match send_datagram(&self.socket, self.mode, &self.announcement, target) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    trace!(target: LAN_TARGET, %error, "announcement not sent");
                    last_error = Some(error);
                }
            }
        }
        match (delivered, last_error) {
            (0, Some(EngineError::Send { source, .. })) => Err(EngineError::Broadcast {
                attempted: self.targets.len(),
                source,
            }),
            (0, _) => Err(EngineError::Broadcast {
                attempted: self.targets.len(),
                source: io::Error::other("no broadcast targets"),
            }),
            _ => Ok(delivered),
        }
    }
}

fn broadcast_targets(mode: IpMode, port: u16) -> Vec<SocketAddr> {
    let mut targets = vec![SocketAddr::from((Ipv4Addr::BROADCAST, port))];
    if mode.is_ipv6() {
        targets.push(SocketAddr::from((ALL_NODES, port)));
    }
    targets
}
