//! Configuration for the bootstrap daemon.
//!
//! The daemon reads a single TOML document named on the command line. Every
//! setting has a compiled default in [`defaults`]; resolution never leaves a
//! field unset. Missing keys fall back to the default with a warning, while a
//! document that cannot be read or parsed is a hard failure.
//!
//! [`ConfigDocument`] is the thin adapter over the parsed document. Its typed
//! lookups report [`Lookup::Absent`] and [`Lookup::Mismatched`] separately so
//! callers decide how each outcome is logged. [`Settings::resolve`] builds the
//! immutable settings record consumed by the rest of the daemon, and
//! [`bootstrap_nodes`] exposes the raw seed peer list for the peer resolver.

pub mod defaults;
mod document;
mod logging;
mod motd;
mod nodes;
mod relay_ports;
mod settings;

pub use defaults::{
    DEFAULT_ENABLE_IPV4_FALLBACK, DEFAULT_ENABLE_IPV6, DEFAULT_ENABLE_LAN_DISCOVERY,
    DEFAULT_ENABLE_MOTD, DEFAULT_ENABLE_TCP_RELAY, DEFAULT_KEYS_FILE_PATH, DEFAULT_MOTD,
    DEFAULT_PID_FILE_PATH, DEFAULT_PORT, DEFAULT_TCP_RELAY_PORTS, MAX_ALLOWED_PORT,
    MAX_MOTD_LENGTH, MIN_ALLOWED_PORT,
};
pub use document::{ConfigDocument, DocumentError, Lookup, ValueKind};
pub use logging::LogBackend;
pub use motd::truncate_motd;
pub use nodes::{BootstrapNodeRecord, BootstrapNodes, bootstrap_nodes};
pub use relay_ports::resolve_relay_ports;
pub use settings::{MotdSettings, RelaySettings, Settings, SettingsError};

/// Tracing target used for configuration resolution events.
pub const CONFIG_TARGET: &str = "bootstrapd_config::resolve";

/// Returns whether `value` is an acceptable UDP or TCP port number.
#[must_use]
pub fn is_valid_port(value: i64) -> bool {
    (MIN_ALLOWED_PORT..=MAX_ALLOWED_PORT).contains(&value)
}
