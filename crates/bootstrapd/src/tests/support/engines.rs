//! In-memory engine doubles that record every call in order.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use bootstrapd_net::{
    DiscoveryEngine, EngineError, Engines, IdentitySlots, IpMode, KeyPair, LanBroadcaster,
    PublicKey, RelayEngine,
};

/// Calls observed by the engine doubles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A bind was attempted.
    Bind(IpMode, u16),
    /// The discovery engine was advanced.
    Advance,
    /// The network was polled.
    Poll,
    /// A seed peer was registered.
    Bootstrap {
        /// Address handed to the engine.
        address: String,
        /// Port handed to the engine.
        port: u16,
        /// IPv6 flag handed to the engine.
        ipv6_enabled: bool,
    },
    /// The MOTD was installed.
    Motd(u32, String),
    /// The relay was started.
    StartRelay(IpMode, Vec<u16>),
    /// The relay was advanced.
    RelayAdvance,
    /// The LAN broadcaster was created.
    LanReady(u16),
    /// A LAN broadcast was sent.
    Broadcast,
}

/// Shared, ordered record of engine calls.
#[derive(Debug, Clone, Default)]
pub struct EngineLog(Arc<Mutex<Vec<EngineEvent>>>);

impl EngineLog {
    /// Appends `event`.
    pub fn record(&self, event: EngineEvent) {
        self.0.lock().expect("engine log mutex poisoned").push(event);
    }

    /// Snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<EngineEvent> {
        self.0.lock().expect("engine log mutex poisoned").clone()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.0.lock().expect("engine log mutex poisoned").clear();
    }
}

/// Bound socket stand-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeNetwork {
    pub mode: IpMode,
    pub port: u16,
}

/// Discovery engine double.
#[derive(Debug)]
pub struct FakeDiscovery {
    log: EngineLog,
    keypair: KeyPair,
    connected_after_polls: Option<usize>,
    polls: usize,
}

impl FakeDiscovery {
    /// Builds a discovery double with a fresh keypair.
    #[must_use]
    pub fn new(log: EngineLog) -> Self {
        Self {
            log,
            keypair: KeyPair::generate(),
            connected_after_polls: None,
            polls: 0,
        }
    }

    /// Reports a live peer once `polls` network polls have happened.
    #[must_use]
    pub const fn connected_after(mut self, polls: usize) -> Self {
        self.connected_after_polls = Some(polls);
        self
    }
}

impl IdentitySlots for FakeDiscovery {
    fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    fn install_keypair(&mut self, keypair: KeyPair) {
        self.keypair = keypair;
    }
}

impl DiscoveryEngine for FakeDiscovery {
    fn advance(&mut self) {
        self.log.record(EngineEvent::Advance);
    }

    fn poll_network(&mut self) {
        self.polls += 1;
        self.log.record(EngineEvent::Poll);
    }

    fn is_connected(&self) -> bool {
        self.connected_after_polls
            .is_some_and(|threshold| self.polls >= threshold)
    }

    fn bootstrap_from_address(
        &mut self,
        address: &str,
        ipv6_enabled: bool,
        port: u16,
        _public_key: &PublicKey,
    ) -> Result<SocketAddr, EngineError> {
        self.log.record(EngineEvent::Bootstrap {
            address: address.to_owned(),
            port,
            ipv6_enabled,
        });
        Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }

    fn set_motd(&mut self, version: u32, motd: &str) -> Result<(), EngineError> {
        self.log.record(EngineEvent::Motd(version, motd.to_owned()));
        Ok(())
    }
}

/// Relay double.
#[derive(Debug)]
pub struct FakeRelay {
    log: EngineLog,
}

impl FakeRelay {
    /// Builds a relay double recording into `log`.
    #[must_use]
    pub const fn new(log: EngineLog) -> Self {
        Self { log }
    }
}

impl RelayEngine for FakeRelay {
    fn advance(&mut self) {
        self.log.record(EngineEvent::RelayAdvance);
    }
}

/// LAN broadcaster double.
#[derive(Debug)]
pub struct FakeBroadcaster {
    log: EngineLog,
    fail: bool,
}

impl FakeBroadcaster {
    /// Builds a broadcaster double recording into `log`.
    #[must_use]
    pub const fn new(log: EngineLog) -> Self {
        Self { log, fail: false }
    }

    /// Makes every broadcast fail after being recorded.
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl LanBroadcaster for FakeBroadcaster {
    fn broadcast(&mut self) -> Result<usize, EngineError> {
        self.log.record(EngineEvent::Broadcast);
        if self.fail {
            return Err(EngineError::Broadcast {
                attempted: 1,
                source: std::io::Error::other("network unreachable"),
            });
        }
        Ok(1)
    }
}

/// Engine factory double.
#[derive(Debug, Clone, Default)]
pub struct FakeEngines {
    pub log: EngineLog,
    unbindable: Vec<IpMode>,
    relay_fails: bool,
}

impl FakeEngines {
    /// Makes binds under `mode` fail.
    pub fn refuse_binds(&mut self, mode: IpMode) {
        self.unbindable.push(mode);
    }

    /// Makes relay startup fail.
    pub fn refuse_relay(&mut self) {
        self.relay_fails = true;
    }
}

impl Engines for FakeEngines {
    type Network = FakeNetwork;
    type Discovery = FakeDiscovery;
    type Relay = FakeRelay;
    type Broadcaster = FakeBroadcaster;

    fn bind_network(&self, mode: IpMode, port: u16) -> Result<Self::Network, EngineError> {
        self.log.record(EngineEvent::Bind(mode, port));
        if self.unbindable.contains(&mode) {
            return Err(EngineError::Bind {
                mode,
                port,
                source: std::io::Error::from(std::io::ErrorKind::AddrNotAvailable),
            });
        }
        Ok(FakeNetwork { mode, port })
    }

    fn discovery(&self, _network: Self::Network) -> Result<Self::Discovery, EngineError> {
        Ok(FakeDiscovery::new(self.log.clone()))
    }

    fn start_relay(
        &self,
        mode: IpMode,
        ports: &[u16],
        _keypair: &KeyPair,
    ) -> Result<Self::Relay, EngineError> {
        self.log.record(EngineEvent::StartRelay(mode, ports.to_vec()));
        if self.relay_fails {
            return Err(EngineError::RelayUnavailable {
                ports: ports.to_vec(),
            });
        }
        Ok(FakeRelay::new(self.log.clone()))
    }

    fn lan_broadcaster(
        &self,
        _discovery: &Self::Discovery,
        port: u16,
    ) -> Result<Self::Broadcaster, EngineError> {
        self.log.record(EngineEvent::LanReady(port));
        Ok(FakeBroadcaster::new(self.log.clone()))
    }
}
