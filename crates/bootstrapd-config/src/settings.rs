//! Resolves the configuration document into the immutable settings record.

use std::fmt::Display;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::defaults::{
    DEFAULT_ENABLE_IPV4_FALLBACK, DEFAULT_ENABLE_IPV6, DEFAULT_ENABLE_LAN_DISCOVERY,
    DEFAULT_ENABLE_MOTD, DEFAULT_ENABLE_TCP_RELAY, DEFAULT_KEYS_FILE_PATH, DEFAULT_MOTD,
    DEFAULT_PID_FILE_PATH, DEFAULT_PORT, MAX_ALLOWED_PORT, MIN_ALLOWED_PORT,
};
use crate::document::{ConfigDocument, DocumentError, Lookup};
use crate::motd::truncate_motd;
use crate::relay_ports::resolve_relay_ports;
use crate::{CONFIG_TARGET, is_valid_port};

const NAME_PORT: &str = "port";
const NAME_PID_FILE_PATH: &str = "pid_file_path";
const NAME_KEYS_FILE_PATH: &str = "keys_file_path";
const NAME_ENABLE_IPV6: &str = "enable_ipv6";
const NAME_ENABLE_IPV4_FALLBACK: &str = "enable_ipv4_fallback";
const NAME_ENABLE_LAN_DISCOVERY: &str = "enable_lan_discovery";
const NAME_ENABLE_TCP_RELAY: &str = "enable_tcp_relay";
const NAME_ENABLE_MOTD: &str = "enable_motd";
const NAME_MOTD: &str = "motd";

/// Errors raised while resolving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The document could not be loaded.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The top-level port is outside the allowed range.
    #[error("invalid port {port}, should be in [1, 65535]")]
    InvalidPort {
        /// Value found after resolution.
        port: i64,
    },
}

/// TCP relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    /// Whether the relay engine is started.
    pub enabled: bool,
    /// Validated listening ports in configured order. Empty when disabled.
    pub ports: Vec<u16>,
}

/// Message-of-the-day settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotdSettings {
    /// Whether the MOTD is served.
    pub enabled: bool,
    /// Truncated message. Empty when disabled.
    pub text: String,
}

/// Fully resolved daemon settings.
///
/// Every field holds a value once [`Settings::resolve`] returns; absent keys
/// are replaced by compiled defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// UDP port for the discovery engine.
    pub port: u16,
    /// Location of the PID file.
    pub pid_file_path: Utf8PathBuf,
    /// Location of the identity keys file.
    pub keys_file_path: Utf8PathBuf,
    /// Whether IPv6 is requested.
    pub enable_ipv6: bool,
    /// Whether a failed IPv6 bind retries under IPv4.
    pub enable_ipv4_fallback: bool,
    /// Whether LAN discovery broadcasts are sent.
    pub enable_lan_discovery: bool,
    /// TCP relay settings.
    pub relay: RelaySettings,
    /// Message-of-the-day settings.
    pub motd: MotdSettings,
}

impl Settings {
    /// Loads the document at `path` and resolves it.
    pub fn load(path: &Utf8Path) -> Result<Self, SettingsError> {
        let document = ConfigDocument::load(path)?;
        Self::resolve(&document)
    }

    /// Resolves every setting against `document`.
    ///
    /// Only an out-of-range top-level port fails; every other problem falls
    /// back to a default and is logged.
    pub fn resolve(document: &ConfigDocument) -> Result<Self, SettingsError> {
        let port = resolve_scalar(document.integer(NAME_PORT), NAME_PORT, DEFAULT_PORT);
        let pid_file_path = resolve_scalar(
            document.string(NAME_PID_FILE_PATH),
            NAME_PID_FILE_PATH,
            DEFAULT_PID_FILE_PATH,
        );
        let keys_file_path = resolve_scalar(
            document.string(NAME_KEYS_FILE_PATH),
            NAME_KEYS_FILE_PATH,
            DEFAULT_KEYS_FILE_PATH,
        );
        let enable_ipv6 = resolve_scalar(
            document.boolean(NAME_ENABLE_IPV6),
            NAME_ENABLE_IPV6,
            DEFAULT_ENABLE_IPV6,
        );
        let enable_ipv4_fallback = resolve_scalar(
            document.boolean(NAME_ENABLE_IPV4_FALLBACK),
            NAME_ENABLE_IPV4_FALLBACK,
            DEFAULT_ENABLE_IPV4_FALLBACK,
        );
        let enable_lan_discovery = resolve_scalar(
            document.boolean(NAME_ENABLE_LAN_DISCOVERY),
            NAME_ENABLE_LAN_DISCOVERY,
            DEFAULT_ENABLE_LAN_DISCOVERY,
        );
        let enable_tcp_relay = resolve_scalar(
            document.boolean(NAME_ENABLE_TCP_RELAY),
            NAME_ENABLE_TCP_RELAY,
            DEFAULT_ENABLE_TCP_RELAY,
        );
        let relay_ports = if enable_tcp_relay {
            resolve_relay_ports(document)
        } else {
            Vec::new()
        };
        let enable_motd = resolve_scalar(
            document.boolean(NAME_ENABLE_MOTD),
            NAME_ENABLE_MOTD,
            DEFAULT_ENABLE_MOTD,
        );
        let motd = if enable_motd {
            truncate_motd(resolve_scalar(
                document.string(NAME_MOTD),
                NAME_MOTD,
                DEFAULT_MOTD,
            ))
        } else {
            String::new()
        };

        let settings = Self {
            port: checked_port(port)?,
            pid_file_path: Utf8PathBuf::from(pid_file_path),
            keys_file_path: Utf8PathBuf::from(keys_file_path),
            enable_ipv6,
            enable_ipv4_fallback,
            enable_lan_discovery,
            relay: RelaySettings {
                enabled: enable_tcp_relay,
                ports: relay_ports,
            },
            motd: MotdSettings {
                enabled: enable_motd,
                text: motd,
            },
        };
        settings.report();
        Ok(settings)
    }

    fn report(&self) {
        info!(
            target: CONFIG_TARGET,
            pid_file_path = %self.pid_file_path,
            keys_file_path = %self.keys_file_path,
            port = self.port,
            enable_ipv6 = self.enable_ipv6,
            enable_ipv4_fallback = self.enable_ipv4_fallback,
            enable_lan_discovery = self.enable_lan_discovery,
            enable_tcp_relay = self.relay.enabled,
            enable_motd = self.motd.enabled,
            "configuration read successfully"
        );
        if self.relay.enabled {
            if self.relay.ports.is_empty() {
                error!(target: CONFIG_TARGET, "no TCP relay ports could be read");
            } else {
                info!(
                    target: CONFIG_TARGET,
                    count = self.relay.ports.len(),
                    "read TCP relay ports"
                );
                for (index, port) in self.relay.ports.iter().enumerate() {
                    info!(target: CONFIG_TARGET, index, port, "relay port");
                }
            }
        }
        if self.motd.enabled {
            info!(target: CONFIG_TARGET, motd = %self.motd.text, "message of the day");
        }
    }
}

fn resolve_scalar<T: Display>(lookup: Lookup<T>, key: &str, default: T) -> T {
    match lookup {
        Lookup::Found(value) => value,
        Lookup::Absent => {
            warn!(
                target: CONFIG_TARGET,
                key,
                "setting missing from configuration file"
            );
            warn!(target: CONFIG_TARGET, key, %default, "using default");
            default
        }
        Lookup::Mismatched { found } => {
            warn!(
                target: CONFIG_TARGET,
                key,
                %found,
                "setting has the wrong type"
            );
            warn!(target: CONFIG_TARGET, key, %default, "using default");
            default
        }
    }
}

fn checked_port(port: i64) -> Result<u16, SettingsError> {
    match u16::try_from(port) {
        Ok(valid) if is_valid_port(port) => Ok(valid),
        _ => {
            error!(
                target: CONFIG_TARGET,
                port,
                min = MIN_ALLOWED_PORT,
                max = MAX_ALLOWED_PORT,
                "invalid port"
            );
            Err(SettingsError::InvalidPort { port })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::sync::{Arc, Mutex};

    use rstest::rstest;
    use tracing_subscriber::fmt::MakeWriter;

    use crate::defaults::MAX_MOTD_LENGTH;

    fn resolve(source: &str) -> Result<Settings, SettingsError> {
        let document = ConfigDocument::parse(source).expect("document should parse");
        Settings::resolve(&document)
    }

    /// Formatted log output collected in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            let bytes = self.0.lock().expect("log buffer mutex poisoned");
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .expect("log buffer mutex poisoned")
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn logged<T>(action: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let outcome = tracing::subscriber::with_default(subscriber, action);
        (outcome, logs.text())
    }

    #[rstest]
    fn empty_document_resolves_to_defaults() {
        let settings = resolve("").expect("defaults should resolve");
        assert_eq!(settings.port, 33445);
        assert_eq!(settings.pid_file_path, DEFAULT_PID_FILE_PATH);
        assert_eq!(settings.keys_file_path, DEFAULT_KEYS_FILE_PATH);
        assert!(settings.enable_ipv6);
        assert!(settings.enable_ipv4_fallback);
        assert!(settings.enable_lan_discovery);
        assert_eq!(
            settings.relay,
            RelaySettings {
                enabled: true,
                ports: vec![443, 3389, 33445],
            }
        );
        assert_eq!(
            settings.motd,
            MotdSettings {
                enabled: true,
                text: DEFAULT_MOTD.to_owned(),
            }
        );
    }

    #[rstest]
    fn mistyped_scalars_fall_back_to_defaults() {
        let settings = resolve(
            r#"
            port = "eleven"
            enable_ipv6 = "no"
            pid_file_path = 7
            "#,
        )
        .expect("mistyped scalars should resolve");
        assert_eq!(settings.port, 33445);
        assert!(settings.enable_ipv6);
        assert_eq!(settings.pid_file_path, DEFAULT_PID_FILE_PATH);
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(65536)]
    fn out_of_range_port_is_fatal(#[case] port: i64) {
        let error = resolve(&format!("port = {port}")).expect_err("port must be rejected");
        assert!(matches!(error, SettingsError::InvalidPort { port: found } if found == port));
    }

    #[rstest]
    fn disabled_relay_resolves_no_ports() {
        let settings = resolve("enable_tcp_relay = false\ntcp_relay_ports = [443]")
            .expect("settings should resolve");
        assert!(!settings.relay.enabled);
        assert!(settings.relay.ports.is_empty());
    }

    #[rstest]
    fn enabled_relay_with_unusable_ports_resolves_empty() {
        let settings = resolve("tcp_relay_ports = \"443\"").expect("settings should resolve");
        assert!(settings.relay.enabled);
        assert!(settings.relay.ports.is_empty());
    }

    #[rstest]
    fn long_motd_is_truncated() {
        let motd = "m".repeat(1000);
        let settings =
            resolve(&format!("motd = \"{motd}\"")).expect("settings should resolve");
        assert_eq!(settings.motd.text.len(), MAX_MOTD_LENGTH - 1);
    }

    #[rstest]
    fn disabled_motd_is_empty() {
        let settings =
            resolve("enable_motd = false\nmotd = \"hi\"").expect("settings should resolve");
        assert!(!settings.motd.enabled);
        assert!(settings.motd.text.is_empty());
    }

    #[rstest]
    fn configured_values_override_defaults() {
        let settings = resolve(
            r#"
            port = 40000
            keys_file_path = "/var/lib/bootstrapd/keys"
            enable_ipv6 = false
            enable_lan_discovery = false
            "#,
        )
        .expect("settings should resolve");
        assert_eq!(settings.port, 40000);
        assert_eq!(settings.keys_file_path, "/var/lib/bootstrapd/keys");
        assert!(!settings.enable_ipv6);
        assert!(!settings.enable_lan_discovery);
    }

    #[rstest]
    fn missing_setting_is_logged_with_its_default() {
        let (settings, logs) = logged(|| resolve("port = 33445"));
        settings.expect("defaults should resolve");
        assert!(logs.contains("setting missing from configuration file"));
        assert!(logs.contains("using default"));
        assert!(logs.contains(NAME_KEYS_FILE_PATH));
        assert!(logs.contains("bootstrapd_config::resolve"));
    }

    #[rstest]
    fn mistyped_setting_is_logged() {
        let (settings, logs) = logged(|| resolve("enable_ipv6 = \"yes\""));
        assert!(settings.expect("defaults should resolve").enable_ipv6);
        assert!(logs.contains("setting has the wrong type"));
        assert!(logs.contains(NAME_ENABLE_IPV6));
    }

    #[rstest]
    fn non_array_relay_ports_are_logged() {
        let (ports, logs) = logged(|| {
            let document =
                ConfigDocument::parse("tcp_relay_ports = 443").expect("document should parse");
            resolve_relay_ports(&document)
        });
        assert!(ports.is_empty());
        assert!(logs.contains("setting should be an array"));
    }

    #[rstest]
    fn load_failure_is_reported_once_by_the_caller() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = Utf8PathBuf::from_path_buf(dir.path().join("absent.toml"))
            .expect("utf-8 temp path");
        let (outcome, logs) = logged(|| Settings::load(&missing));
        assert!(matches!(outcome, Err(SettingsError::Document(_))));
        assert!(logs.is_empty(), "unexpected log output: {logs}");
    }
}
