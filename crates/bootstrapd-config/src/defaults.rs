//! Compiled defaults used whenever the configuration document omits a key.

/// Default UDP port for the discovery engine.
pub const DEFAULT_PORT: i64 = 33445;

/// Default location of the PID file, relative to the launch directory.
pub const DEFAULT_PID_FILE_PATH: &str = "bootstrapd.pid";

/// Default location of the identity keys file, relative to the launch directory.
pub const DEFAULT_KEYS_FILE_PATH: &str = "bootstrapd.keys";

/// Whether IPv6 is requested when the key is absent.
pub const DEFAULT_ENABLE_IPV6: bool = true;

/// Whether a failed IPv6 bind retries under IPv4 when the key is absent.
pub const DEFAULT_ENABLE_IPV4_FALLBACK: bool = true;

/// Whether LAN discovery broadcasts are sent when the key is absent.
pub const DEFAULT_ENABLE_LAN_DISCOVERY: bool = true;

/// Whether the TCP relay is started when the key is absent.
pub const DEFAULT_ENABLE_TCP_RELAY: bool = true;

/// Relay ports used when `tcp_relay_ports` is absent.
pub const DEFAULT_TCP_RELAY_PORTS: [i64; 3] = [443, 3389, 33445];

/// Whether the message of the day is served when the key is absent.
pub const DEFAULT_ENABLE_MOTD: bool = true;

/// Message of the day used when `motd` is absent.
pub const DEFAULT_MOTD: &str = "bootstrapd";

/// Maximum MOTD size in bytes, counting the trailing NUL sent on the wire.
pub const MAX_MOTD_LENGTH: usize = 256;

/// Smallest port accepted anywhere in the configuration.
pub const MIN_ALLOWED_PORT: i64 = 1;

/// Largest port accepted anywhere in the configuration.
pub const MAX_ALLOWED_PORT: i64 = 65535;
