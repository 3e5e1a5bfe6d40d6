//! Steady-state scheduler driving the engines once the daemon has detached.

use std::thread;
use std::time::{Duration, Instant};

use bootstrapd_net::{DiscoveryEngine, LanBroadcaster, RelayEngine};
use tracing::{info, warn};

const LOOP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::poll_loop");

/// Minimum time between two LAN discovery broadcasts.
pub const LAN_DISCOVERY_INTERVAL: Duration = Duration::from_secs(10);

/// Sleep between two iterations of the loop.
pub const TICK_SLEEP: Duration = Duration::from_millis(30);

/// Single-threaded loop advancing the discovery, relay and LAN engines.
#[derive(Debug)]
pub struct PollLoop<D, R, B> {
    discovery: D,
    relay: Option<R>,
    broadcaster: Option<B>,
    last_broadcast: Option<Instant>,
    waiting_for_peer: bool,
}

impl<D, R, B> PollLoop<D, R, B>
where
    D: DiscoveryEngine,
    R: RelayEngine,
    B: LanBroadcaster,
{
    /// Builds a loop. `relay` and `broadcaster` are `None` when the
    /// corresponding feature is disabled.
    #[must_use]
    pub const fn new(discovery: D, relay: Option<R>, broadcaster: Option<B>) -> Self {
        Self {
            discovery,
            relay,
            broadcaster,
            last_broadcast: None,
            waiting_for_peer: true,
        }
    }

    /// Runs one iteration at time `now` without sleeping.
    pub fn tick(&mut self, now: Instant) {
        self.discovery.advance();

        if let Some(broadcaster) = self.broadcaster.as_mut() {
            let due = self
                .last_broadcast
                .is_none_or(|last| now.saturating_duration_since(last) >= LAN_DISCOVERY_INTERVAL);
            if due {
                if let Err(error) = broadcaster.broadcast() {
                    warn!(target: LOOP_TARGET, %error, "LAN discovery broadcast failed");
                }
                self.last_broadcast = Some(now);
            }
        }

        if let Some(relay) = self.relay.as_mut() {
            relay.advance();
        }

        self.discovery.poll_network();

        if self.waiting_for_peer && self.discovery.is_connected() {
            info!(target: LOOP_TARGET, "connected to at least one other bootstrap node");
            self.waiting_for_peer = false;
        }
    }

    /// Runs the loop until the process is terminated.
    pub fn run(mut self) -> ! {
        loop {
            self.tick(Instant::now());
            thread::sleep(TICK_SLEEP);
        }
    }

    /// Whether no peer has been seen yet.
    #[must_use]
    pub const fn is_waiting_for_peer(&self) -> bool {
        self.waiting_for_peer
    }

    /// Discovery engine driven by the loop.
    #[must_use]
    pub const fn discovery(&self) -> &D {
        &self.discovery
    }

    /// Whether a relay engine is being advanced.
    #[must_use]
    pub const fn has_relay(&self) -> bool {
        self.relay.is_some()
    }

    /// Whether LAN discovery broadcasts are sent.
    #[must_use]
    pub const fn has_broadcaster(&self) -> bool {
        self.broadcaster.is_some()
    }
}
