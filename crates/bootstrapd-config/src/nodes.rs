//! Raw access to the configured seed peer list.

use toml::{Table, Value};

use crate::document::{ConfigDocument, Lookup, ValueKind, lookup};

const NAME_BOOTSTRAP_NODES: &str = "bootstrap_nodes";
const NAME_PUBLIC_KEY: &str = "public_key";
const NAME_PORT: &str = "port";
const NAME_ADDRESS: &str = "address";

/// Shape of the `bootstrap_nodes` setting.
#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapNodes {
    /// The key is missing from the document.
    Absent,
    /// The key holds something other than a list of records.
    NotAList {
        /// Kind of value actually stored under the key.
        found: ValueKind,
    },
    /// The configured records in document order.
    Records(Vec<BootstrapNodeRecord>),
}

/// One entry from `bootstrap_nodes`, before validation.
///
/// Each field keeps its lookup outcome so the peer resolver can name the
/// offending field when it skips the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapNodeRecord {
    /// Hex-encoded public key of the peer.
    pub public_key: Lookup<String>,
    /// Port the peer listens on.
    pub port: Lookup<i64>,
    /// Hostname or literal IP address.
    pub address: Lookup<String>,
}

impl BootstrapNodeRecord {
    /// Key name of the public key field.
    pub const PUBLIC_KEY: &'static str = NAME_PUBLIC_KEY;
    /// Key name of the port field.
    pub const PORT: &'static str = NAME_PORT;
    /// Key name of the address field.
    pub const ADDRESS: &'static str = NAME_ADDRESS;

    fn from_value(value: &Value) -> Self {
        match value.as_table() {
            Some(table) => Self::from_table(table),
            None => Self {
                public_key: Lookup::Absent,
                port: Lookup::Absent,
                address: Lookup::Absent,
            },
        }
    }

    fn from_table(table: &Table) -> Self {
        Self {
            public_key: lookup(table, NAME_PUBLIC_KEY, |value| {
                value.as_str().map(str::to_owned)
            }),
            port: lookup(table, NAME_PORT, Value::as_integer),
            address: lookup(table, NAME_ADDRESS, |value| value.as_str().map(str::to_owned)),
        }
    }
}

/// Extracts a snapshot of the `bootstrap_nodes` list from the document.
#[must_use]
pub fn bootstrap_nodes(document: &ConfigDocument) -> BootstrapNodes {
    match document.array(NAME_BOOTSTRAP_NODES) {
        Lookup::Absent => BootstrapNodes::Absent,
        Lookup::Mismatched { found } => BootstrapNodes::NotAList { found },
        Lookup::Found(values) => BootstrapNodes::Records(
            values
                .iter()
                .map(BootstrapNodeRecord::from_value)
                .collect(),
        ),
    }
}
