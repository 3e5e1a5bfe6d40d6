//! Resolution of the `tcp_relay_ports` list.

use toml::Value;
use tracing::{error, info, warn};

use crate::defaults::{DEFAULT_TCP_RELAY_PORTS, MAX_ALLOWED_PORT, MIN_ALLOWED_PORT};
use crate::document::{ConfigDocument, Lookup, ValueKind};
use crate::{CONFIG_TARGET, is_valid_port};

const NAME_TCP_RELAY_PORTS: &str = "tcp_relay_ports";

/// Resolves the relay listening ports.
///
/// An absent key yields the compiled defaults, run through the same range
/// check as configured ports. A value that is not an array, or an empty
/// array, yields no ports at all; the caller decides whether that is fatal.
/// Within an array, non-integer and out-of-range elements are skipped and the
/// remaining ports keep their relative order. Duplicates are preserved.
#[must_use]
pub fn resolve_relay_ports(document: &ConfigDocument) -> Vec<u16> {
    match document.array(NAME_TCP_RELAY_PORTS) {
        Lookup::Absent => {
            warn!(
                target: CONFIG_TARGET,
                key = NAME_TCP_RELAY_PORTS,
                "setting missing from configuration file"
            );
            warn!(
                target: CONFIG_TARGET,
                key = NAME_TCP_RELAY_PORTS,
                ports = ?DEFAULT_TCP_RELAY_PORTS,
                "using default relay ports"
            );
            for (index, port) in DEFAULT_TCP_RELAY_PORTS.iter().enumerate() {
                info!(target: CONFIG_TARGET, index, port, "default relay port");
            }
            validate_ports(DEFAULT_TCP_RELAY_PORTS.iter().map(|port| Some(*port)))
        }
        Lookup::Mismatched { found } => {
            error!(
                target: CONFIG_TARGET,
                key = NAME_TCP_RELAY_PORTS,
                %found,
                "setting should be an array, e.g. tcp_relay_ports = [443, 3389]"
            );
            Vec::new()
        }
        Lookup::Found([]) => {
            error!(
                target: CONFIG_TARGET,
                key = NAME_TCP_RELAY_PORTS,
                "relay port array is empty"
            );
            Vec::new()
        }
        Lookup::Found(elements) => validate_ports(elements.iter().enumerate().map(
            |(index, element)| match element {
                Value::Integer(port) => Some(*port),
                other => {
                    warn!(
                        target: CONFIG_TARGET,
                        index,
                        found = %ValueKind::of(other),
                        "relay port is not a number; skipping"
                    );
                    None
                }
            },
        )),
    }
}

fn validate_ports(candidates: impl Iterator<Item = Option<i64>>) -> Vec<u16> {
    let mut ports = Vec::with_capacity(candidates.size_hint().0);
    for (index, candidate) in candidates.enumerate() {
        let Some(value) = candidate else {
            continue;
        };
        match u16::try_from(value) {
            Ok(port) if is_valid_port(value) => ports.push(port),
            _ => warn!(
                target: CONFIG_TARGET,
                index,
                port = value,
                min = MIN_ALLOWED_PORT,
                max = MAX_ALLOWED_PORT,
                "invalid relay port; skipping"
            ),
        }
    }
    ports.shrink_to_fit();
    ports
}
