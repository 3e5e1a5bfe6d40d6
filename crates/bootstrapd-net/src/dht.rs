//! Peer table and datagram handling for the discovery engine.

use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::EngineError;
use crate::identity::{IdentitySlots, KeyPair, PublicKey};
use crate::network::{IpMode, NetworkCore};
use crate::packets::{
    self, MAX_INFO_MOTD_LENGTH, PACKET_HELLO, PACKET_HELLO_ACK, Packet,
};
use crate::DiscoveryEngine;

const DHT_TARGET: &str = "bootstrapd_net::dht";

/// Interval between hellos sent to every known peer.
pub const PING_INTERVAL: Duration = Duration::from_secs(20);

/// A peer that has not been heard from for this long is no longer live.
pub const PEER_TIMEOUT: Duration = Duration::from_secs(122);

/// Upper bound on peers learned from the network. Seed peers do not count
/// against it.
pub const MAX_PEERS: usize = 1024;

/// Datagrams handled by one [`DiscoveryEngine::poll_network`] call. Whatever
/// is still queued waits for the next tick.
pub const MAX_DATAGRAMS_PER_TICK: usize = 64;

const RECEIVE_BUFFER_LEN: usize = 2048;

#[derive(Debug, Clone, Copy)]
struct PeerState {
    public_key: PublicKey,
    added: Instant,
    last_seen: Option<Instant>,
    seed: bool,
}

impl PeerState {
    /// Seed peers are kept for the lifetime of the engine.
    fn is_stale(&self, now: Instant) -> bool {
        let heard = self.last_seen.unwrap_or(self.added);
        !self.seed && now.saturating_duration_since(heard) >= PEER_TIMEOUT
    }
}

/// Picks the address to contact from a resolver's answers.
///
/// IPv6 answers are preferred when both the caller and the socket allow them;
/// otherwise only IPv4 answers are eligible.
fn preferred_address(
    candidates: impl IntoIterator<Item = SocketAddr>,
    ipv6_enabled: bool,
    mode: IpMode,
) -> Option<SocketAddr> {
    let prefer_ipv6 = ipv6_enabled && mode.is_ipv6();
    candidates
        .into_iter()
        .filter(|candidate| prefer_ipv6 || candidate.is_ipv4())
        .min_by_key(|candidate| candidate.is_ipv6() != prefer_ipv6)
}

/// UDP discovery engine.
#[derive(Debug)]
pub struct Dht {
    network: NetworkCore,
    keypair: KeyPair,
    peers: HashMap<SocketAddr, PeerState>,
    info_response: Option<Vec<u8>>,
    last_ping: Option<Instant>,
}

impl Dht {
    /// Builds an engine on `network` using `keypair` as its identity.
    #[must_use]
    pub fn new(network: NetworkCore, keypair: KeyPair) -> Self {
        Self {
            network,
            keypair,
            peers: HashMap::new(),
            info_response: None,
            last_ping: None,
        }
    }

    /// Socket the engine sends and receives on.
    #[must_use]
    pub const fn network(&self) -> &NetworkCore {
        &self.network
    }

    /// Number of peers currently known, live or not.
    #[must_use]
    pub fn known_peers(&self) -> usize {
        self.peers.len()
    }

    /// Drops silent peers, then pings the rest if the ping interval elapsed.
    pub fn advance_at(&mut self, now: Instant) {
        self.evict_stale(now);
        let due = self
            .last_ping
            .is_none_or(|last| now.saturating_duration_since(last) >= PING_INTERVAL);
        if !due {
            return;
        }
        self.last_ping = Some(now);
        for &target in self.peers.keys() {
            self.send_presence(PACKET_HELLO, target);
        }
    }

    fn evict_stale(&mut self, now: Instant) {
        let before = self.peers.len();
        self.peers.retain(|_, peer| !peer.is_stale(now));
        let evicted = before.saturating_sub(self.peers.len());
        if evicted > 0 {
            debug!(target: DHT_TARGET, evicted, remaining = self.peers.len(), "dropped silent peers");
        }
    }

    fn send_presence(&self, kind: u8, target: SocketAddr) {
        let datagram = packets::presence(kind, &self.keypair.public_key());
        if let Err(error) = self.network.send_to(&datagram, target) {
            debug!(target: DHT_TARGET, %error, "presence datagram not sent");
        }
    }

    /// Adds `from` to the table unless it is full. Returns whether the peer
    /// is tracked afterwards.
    fn admit(&mut self, from: SocketAddr, public_key: PublicKey, now: Instant) -> bool {
        if self.peers.contains_key(&from) {
            return true;
        }
        if self.peers.len() >= MAX_PEERS {
            debug!(target: DHT_TARGET, %from, "peer table full, ignoring peer");
            return false;
        }
        self.peers.insert(
            from,
            PeerState {
                public_key,
                added: now,
                last_seen: None,
                seed: false,
            },
        );
        true
    }

    fn mark_seen(&mut self, from: SocketAddr, public_key: PublicKey, now: Instant) {
        if !self.admit(from, public_key, now) {
            return;
        }
        if let Some(state) = self.peers.get_mut(&from) {
            state.public_key = public_key;
            state.last_seen = Some(now);
        }
    }

    fn handle_datagram(&mut self, datagram: &[u8], from: SocketAddr, now: Instant) {
        let Some(packet) = Packet::decode(datagram) else {
            trace!(target: DHT_TARGET, %from, length = datagram.len(), "ignoring datagram");
            return;
        };
        match packet {
            Packet::Hello(key) if key != self.keypair.public_key() => {
                self.mark_seen(from, key, now);
                self.send_presence(PACKET_HELLO_ACK, from);
            }
            Packet::HelloAck(key) if key != self.keypair.public_key() => {
                self.mark_seen(from, key, now);
            }
            Packet::LanAnnounce(key) if key != self.keypair.public_key() => {
                if !self.peers.contains_key(&from) && self.admit(from, key, now) {
                    debug!(target: DHT_TARGET, %from, peer = %key, "LAN peer discovered");
                    self.send_presence(PACKET_HELLO, from);
                }
            }
            Packet::InfoRequest => {
                if let Some(response) = &self.info_response {
                    if let Err(error) = self.network.send_to(response, from) {
                        debug!(target: DHT_TARGET, %error, "info response not sent");
                    }
                }
            }
            Packet::Hello(_) | Packet::HelloAck(_) | Packet::LanAnnounce(_) => {
                trace!(target: DHT_TARGET, %from, "ignoring our own presence datagram");
            }
        }
    }
}

impl IdentitySlots for Dht {
    fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    fn install_keypair(&mut self, keypair: KeyPair) {
        self.keypair = keypair;
    }
}

impl DiscoveryEngine for Dht {
    fn advance(&mut self) {
        self.advance_at(Instant::now());
    }

    fn poll_network(&mut self) {
        let mut buffer = [0_u8; RECEIVE_BUFFER_LEN];
        for _ in 0..MAX_DATAGRAMS_PER_TICK {
            match self.network.try_recv(&mut buffer) {
                Ok(Some((length, from))) => {
                    let datagram = buffer.get(..length).unwrap_or_default();
                    self.handle_datagram(datagram, from, Instant::now());
                }
                Ok(None) => break,
                Err(error) => {
                    debug!(target: DHT_TARGET, %error, "receive failed");
                    break;
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        let now = Instant::now();
        self.peers.values().any(|peer| {
            peer.last_seen
                .is_some_and(|seen| now.saturating_duration_since(seen) < PEER_TIMEOUT)
        })
    }

    fn bootstrap_from_address(
        &mut self,
        address: &str,
        ipv6_enabled: bool,
        port: u16,
        public_key: &PublicKey,
    ) -> Result<SocketAddr, EngineError> {
        let candidates = (address, port)
            .to_socket_addrs()
            .map_err(|source| EngineError::Resolve {
                address: address.to_owned(),
                source: Some(source),
            })?;
        let usable = preferred_address(candidates, ipv6_enabled, self.network.mode())
            .ok_or_else(|| EngineError::Resolve {
                address: address.to_owned(),
                source: None,
            })?;
        let state = self.peers.entry(usable).or_insert(PeerState {
            public_key: *public_key,
            added: Instant::now(),
            last_seen: None,
            seed: true,
        });
        state.seed = true;
        self.send_presence(PACKET_HELLO, usable);
        Ok(usable)
    }

    fn set_motd(&mut self, version: u32, motd: &str) -> Result<(), EngineError> {
        let length = motd.len() + 1;
        if length > MAX_INFO_MOTD_LENGTH {
            warn!(target: DHT_TARGET, length, "rejecting oversized message of the day");
            return Err(EngineError::MotdTooLong {
                length,
                limit: MAX_INFO_MOTD_LENGTH,
            });
        }
        self.info_response = Some(packets::info_response(version, motd));
        Ok(())
    }
}
