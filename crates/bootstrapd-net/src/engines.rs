//! Production engine factory wiring the UDP, LAN and TCP engines together.

use crate::dht::Dht;
use crate::error::EngineError;
use crate::identity::{IdentitySlots, KeyPair};
use crate::lan::UdpLanBroadcaster;
use crate::network::{IpMode, NetworkCore};
use crate::relay::TcpRelay;
use crate::Engines;

/// Production engine factory backed by real sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpEngines;

impl Engines for UdpEngines {
    type Network = NetworkCore;
    type Discovery = Dht;
    type Relay = TcpRelay;
    type Broadcaster = UdpLanBroadcaster;

    fn bind_network(&self, mode: IpMode, port: u16) -> Result<Self::Network, EngineError> {
        NetworkCore::bind(mode, port)
    }

    fn discovery(&self, network: Self::Network) -> Result<Self::Discovery, EngineError> {
        Ok(Dht::new(network, KeyPair::generate()))
    }

    fn start_relay(
        &self,
        mode: IpMode,
        ports: &[u16],
        keypair: &KeyPair,
    ) -> Result<Self::Relay, EngineError> {
        TcpRelay::start(mode, ports, keypair)
    }

    fn lan_broadcaster(
        &self,
        discovery: &Self::Discovery,
        port: u16,
    ) -> Result<Self::Broadcaster, EngineError> {
        UdpLanBroadcaster::new(discovery.network(), &discovery.keypair().public_key(), port)
    }
}
