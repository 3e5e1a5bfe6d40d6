//! Bootstrap peer resolver.
//!
//! Reads `bootstrap_nodes` from the configuration document, validates each
//! entry independently, and registers the survivors with the discovery
//! engine in document order. A bad entry is skipped with a warning and never
//! stops the remaining entries from being processed; only a document that
//! cannot be loaded fails the whole operation.

use bootstrapd_config::{
    BootstrapNodeRecord, BootstrapNodes, ConfigDocument, DocumentError, Lookup, ValueKind,
    bootstrap_nodes, is_valid_port,
};
use bootstrapd_net::{DiscoveryEngine, EngineError, KeyPairError, PUBLIC_KEY_LEN, PublicKey};
use camino::Utf8Path;
use thiserror::Error;
use tracing::{info, warn};

const PEERS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::peers");
const PUBLIC_KEY_HEX_LEN: usize = PUBLIC_KEY_LEN * 2;

/// A validated seed peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPeer {
    /// Decoded public key.
    pub public_key: PublicKey,
    /// Port in host byte order.
    pub port: u16,
    /// Hostname or literal address, resolved by the discovery engine.
    pub address: String,
}

/// Reasons a configured peer entry is skipped.
#[derive(Debug, Error)]
pub enum PeerRejection {
    /// A required field is missing.
    #[error("missing '{field}' setting")]
    Missing {
        /// Field name.
        field: &'static str,
    },
    /// A required field has the wrong type.
    #[error("'{field}' setting should be {expected}, found {found}")]
    Mismatched {
        /// Field name.
        field: &'static str,
        /// Type the field must have.
        expected: &'static str,
        /// Type actually present.
        found: ValueKind,
    },
    /// The public key is not `2 * PUBLIC_KEY_LEN` hex characters.
    #[error("invalid 'public_key': {source}")]
    PublicKey {
        /// Decoding failure.
        #[source]
        source: KeyPairError,
    },
    /// The port is outside `[1, 65535]`.
    #[error("invalid 'port': {port}, should be in [1, 65535]")]
    Port {
        /// Configured value.
        port: i64,
    },
    /// The discovery engine could not resolve the address.
    #[error("could not resolve address '{address}': {source}")]
    Unresolved {
        /// Configured address.
        address: String,
        /// Engine error.
        #[source]
        source: EngineError,
    },
}

/// Counts produced by [`resolve_bootstrap_peers`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerReport {
    /// Entries handed to the discovery engine successfully.
    pub added: usize,
    /// Entries skipped for any reason.
    pub skipped: usize,
}

/// Loads the document at `config_path` and registers its seed peers with
/// `engine`.
///
/// Returns an error only when the document cannot be loaded.
pub fn resolve_bootstrap_peers<D>(
    config_path: &Utf8Path,
    ipv6_enabled: bool,
    engine: &mut D,
) -> Result<PeerReport, DocumentError>
where
    D: DiscoveryEngine + ?Sized,
{
    let document = ConfigDocument::load(config_path)?;
    Ok(register_peers(&document, ipv6_enabled, engine))
}

/// Registers the seed peers of an already loaded document.
pub fn register_peers<D>(document: &ConfigDocument, ipv6_enabled: bool, engine: &mut D) -> PeerReport
where
    D: DiscoveryEngine + ?Sized,
{
    let records = match bootstrap_nodes(document) {
        BootstrapNodes::Absent => {
            warn!(target: PEERS_TARGET, "no 'bootstrap_nodes' setting, skipping bootstrap");
            return PeerReport::default();
        }
        BootstrapNodes::NotAList { found } => {
            warn!(
                target: PEERS_TARGET,
                %found,
                "'bootstrap_nodes' setting is not a list, skipping bootstrap"
            );
            return PeerReport::default();
        }
        BootstrapNodes::Records(records) if records.is_empty() => {
            warn!(target: PEERS_TARGET, "'bootstrap_nodes' is empty, skipping bootstrap");
            return PeerReport::default();
        }
        BootstrapNodes::Records(records) => records,
    };

    let mut report = PeerReport::default();
    for (index, record) in records.into_iter().enumerate() {
        match validate(record).and_then(|peer| register(peer, ipv6_enabled, engine)) {
            Ok(peer) => {
                report.added += 1;
                info!(
                    target: PEERS_TARGET,
                    index,
                    address = %peer.address,
                    port = peer.port,
                    public_key = %peer.public_key,
                    "added bootstrap node"
                );
            }
            Err(rejection) => {
                report.skipped += 1;
                warn!(
                    target: PEERS_TARGET,
                    index,
                    reason = %rejection,
                    "skipping bootstrap node"
                );
            }
        }
    }
    report
}

/// Checks one entry in order: field presence, key length, port range, then
/// the hex digits of the key.
pub fn validate(record: BootstrapNodeRecord) -> Result<BootstrapPeer, PeerRejection> {
    let BootstrapNodeRecord {
        public_key,
        port,
        address,
    } = record;
    let public_key = required(public_key, BootstrapNodeRecord::PUBLIC_KEY, "a string")?;
    let port = required(port, BootstrapNodeRecord::PORT, "an integer")?;
    let address = required(address, BootstrapNodeRecord::ADDRESS, "a string")?;

    if public_key.len() != PUBLIC_KEY_HEX_LEN {
        return Err(PeerRejection::PublicKey {
            source: KeyPairError::HexLength {
                expected: PUBLIC_KEY_HEX_LEN,
                actual: public_key.len(),
            },
        });
    }
    if !is_valid_port(port) {
        return Err(PeerRejection::Port { port });
    }
    let port = u16::try_from(port).map_err(|_| PeerRejection::Port { port })?;
    let public_key =
        PublicKey::from_hex(&public_key).map_err(|source| PeerRejection::PublicKey { source })?;

    Ok(BootstrapPeer {
        public_key,
        port,
        address,
    })
}

fn required<T>(
    lookup: Lookup<T>,
    field: &'static str,
    expected: &'static str,
) -> Result<T, PeerRejection> {
    match lookup {
        Lookup::Found(value) => Ok(value),
        Lookup::Absent => Err(PeerRejection::Missing { field }),
        Lookup::Mismatched { found } => Err(PeerRejection::Mismatched {
            field,
            expected,
            found,
        }),
    }
}

fn register<D>(
    peer: BootstrapPeer,
    ipv6_enabled: bool,
    engine: &mut D,
) -> Result<BootstrapPeer, PeerRejection>
where
    D: DiscoveryEngine + ?Sized,
{
    match engine.bootstrap_from_address(&peer.address, ipv6_enabled, peer.port, &peer.public_key) {
        Ok(_) => Ok(peer),
        Err(source) => Err(PeerRejection::Unresolved {
            address: peer.address,
            source,
        }),
    }
}
