//! TCP relay listeners.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};

use socket2::{Protocol, Type};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::identity::KeyPair;
use crate::network::{IpMode, canonical};
use crate::RelayEngine;

const RELAY_TARGET: &str = "bootstrapd_net::relay";

const LISTEN_BACKLOG: i32 = 128;
const READ_BUFFER_LEN: usize = 4096;

/// Connections accepted per listener on each tick.
const MAX_ACCEPTS_PER_TICK: usize = 32;

/// Reads performed per connection on each tick.
const MAX_READS_PER_CONNECTION: usize = 16;

#[derive(Debug)]
struct RelayConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

/// Accepts TCP clients on the configured relay ports.
#[derive(Debug)]
pub struct TcpRelay {
    listeners: Vec<(u16, TcpListener)>,
    connections: Vec<RelayConnection>,
    public_key: crate::identity::PublicKey,
}

impl TcpRelay {
    /// Binds a listener on each port. Ports that fail to bind are logged and
    /// skipped; the relay fails only when none bind.
    pub fn start(mode: IpMode, ports: &[u16], keypair: &KeyPair) -> Result<Self, EngineError> {
        let listeners: Vec<(u16, TcpListener)> = ports
            .iter()
            .filter_map(|&port| match bind_listener(mode, port) {
                Ok(listener) => Some((port, listener)),
                Err(error) => {
                    warn!(target: RELAY_TARGET, port, %error, "relay port unavailable");
                    None
                }
            })
            .collect();
        if listeners.is_empty() {
            return Err(EngineError::RelayUnavailable {
                ports: ports.to_vec(),
            });
        }
        info!(
            target: RELAY_TARGET,
            listening = listeners.len(),
            requested = ports.len(),
            "TCP relay listening"
        );
        Ok(Self {
            listeners,
            connections: Vec::new(),
            public_key: keypair.public_key(),
        })
    }

    /// Ports with a bound listener, in configuration order.
    #[must_use]
    pub fn listening_ports(&self) -> Vec<u16> {
        self.listeners.iter().map(|(port, _)| *port).collect()
    }

    /// Number of clients currently connected.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn accept_pending(&mut self) {
        for (port, listener) in &self.listeners {
            for _ in 0..MAX_ACCEPTS_PER_TICK {
                match listener.accept() {
                    Ok((stream, peer)) => {
                        if let Err(error) = stream.set_nonblocking(true) {
                            warn!(target: RELAY_TARGET, %error, "dropping relay client");
                            continue;
                        }
                        let peer = canonical(peer);
                        debug!(target: RELAY_TARGET, port, %peer, relay = %self.public_key, "relay client connected");
                        self.connections.push(RelayConnection { stream, peer });
                    }
                    Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                    Err(error) => {
                        debug!(target: RELAY_TARGET, port, %error, "accept failed");
                        break;
                    }
                }
            }
        }
    }

    fn drain_connections(&mut self) {
        let mut buffer = [0_u8; READ_BUFFER_LEN];
        self.connections
            .retain_mut(|connection| drain_one(connection, &mut buffer));
    }
}

/// Reads what `connection` has queued, up to the per-tick budget. Returns
/// whether the connection stays open.
fn drain_one(connection: &mut RelayConnection, buffer: &mut [u8]) -> bool {
    for _ in 0..MAX_READS_PER_CONNECTION {
        match connection.stream.read(buffer) {
            Ok(0) => {
                debug!(target: RELAY_TARGET, peer = %connection.peer, "relay client closed");
                return false;
            }
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => return true,
            Err(error) => {
                debug!(target: RELAY_TARGET, peer = %connection.peer, %error, "relay client failed");
                return false;
            }
        }
    }
    true
}

impl RelayEngine for TcpRelay {
    fn advance(&mut self) {
        self.accept_pending();
        self.drain_connections();
    }
}

fn bind_listener(mode: IpMode, port: u16) -> io::Result<TcpListener> {
    let socket = mode.bind_socket(Type::STREAM, Protocol::TCP, port)?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket.into())
}
