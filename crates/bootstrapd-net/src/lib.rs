//! Network engines driven by the bootstrap daemon.
//!
//! The daemon core only talks to these engines through the traits defined
//! here: [`DiscoveryEngine`] owns the UDP socket and the peer table,
//! [`RelayEngine`] services the TCP relay listeners, and [`LanBroadcaster`]
//! announces the node on the local segment. [`Engines`] constructs all three
//! so the lifecycle controller can be exercised with test doubles.
//!
//! [`UdpEngines`] is the production factory. Its engines speak a small
//! datagram vocabulary (see [`packets`]) sufficient for seed peers to find
//! each other, answer bootstrap-info requests, and keep liveness.

mod dht;
mod engines;
mod error;
mod identity;
mod lan;
mod network;
pub mod packets;
mod relay;

use std::net::SocketAddr;

pub use dht::{Dht, MAX_DATAGRAMS_PER_TICK, MAX_PEERS, PEER_TIMEOUT, PING_INTERVAL};
pub use engines::UdpEngines;
pub use error::EngineError;
pub use identity::{
    IdentitySlots, KEYS_FILE_LEN, KeyPair, KeyPairError, PUBLIC_KEY_LEN, PublicKey,
    SECRET_KEY_LEN,
};
pub use lan::UdpLanBroadcaster;
pub use network::{IpMode, NetworkCore};
pub use relay::TcpRelay;

/// Peer discovery engine owning the daemon's UDP socket.
pub trait DiscoveryEngine: IdentitySlots {
    /// Advances timers and sends any due keep-alive traffic.
    fn advance(&mut self);

    /// Reads and dispatches every datagram currently queued on the socket.
    ///
    /// Must not block.
    fn poll_network(&mut self);

    /// Whether at least one peer is currently live.
    fn is_connected(&self) -> bool;

    /// Resolves `address` and registers it as a seed peer.
    ///
    /// `port` is in host byte order. When `ipv6_enabled` is false only IPv4
    /// results are considered.
    fn bootstrap_from_address(
        &mut self,
        address: &str,
        ipv6_enabled: bool,
        port: u16,
        public_key: &PublicKey,
    ) -> Result<SocketAddr, EngineError>;

    /// Installs the version and message of the day served to info requests.
    fn set_motd(&mut self, version: u32, motd: &str) -> Result<(), EngineError>;
}

/// TCP relay engine.
pub trait RelayEngine {
    /// Accepts pending connections and services established ones.
    ///
    /// Must not block.
    fn advance(&mut self);
}

/// Local network presence announcer.
pub trait LanBroadcaster {
    /// Sends one announcement round, returning the number of targets reached.
    fn broadcast(&mut self) -> Result<usize, EngineError>;
}

/// Factory for the engines used by the daemon.
pub trait Engines {
    /// Bound socket handed to the discovery engine.
    type Network;
    /// Discovery engine type.
    type Discovery: DiscoveryEngine;
    /// Relay engine type.
    type Relay: RelayEngine;
    /// LAN broadcaster type.
    type Broadcaster: LanBroadcaster;

    /// Binds the discovery socket on `port` under `mode`.
    fn bind_network(&self, mode: IpMode, port: u16) -> Result<Self::Network, EngineError>;

    /// Builds the discovery engine on a bound socket with a fresh keypair.
    fn discovery(&self, network: Self::Network) -> Result<Self::Discovery, EngineError>;

    /// Starts the relay listening on every port in `ports`.
    fn start_relay(
        &self,
        mode: IpMode,
        ports: &[u16],
        keypair: &KeyPair,
    ) -> Result<Self::Relay, EngineError>;

    /// Builds the LAN broadcaster announcing `discovery` on `port`.
    fn lan_broadcaster(
        &self,
        discovery: &Self::Discovery,
        port: u16,
    ) -> Result<Self::Broadcaster, EngineError>;
}
