//! Typed access to the parsed configuration document.

use std::fmt;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use toml::{Table, Value};

/// Errors raised while loading the configuration document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        /// Path that was requested.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file was read but is not a valid document.
    #[error("failed to parse configuration file '{path}': {source}")]
    Parse {
        /// Path that was requested.
        path: Utf8PathBuf,
        /// Underlying parser error, including line and column.
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// Outcome of a typed lookup.
///
/// Absence and a type mismatch are distinct so callers can log them at
/// different levels.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The key exists and holds the requested type.
    Found(T),
    /// The key does not exist.
    Absent,
    /// The key exists with a different type.
    Mismatched {
        /// Kind of value actually stored under the key.
        found: ValueKind,
    },
}

/// Coarse classification of document values, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A string.
    String,
    /// An integer.
    Integer,
    /// A floating point number.
    Float,
    /// A boolean.
    Boolean,
    /// A date or time.
    Datetime,
    /// An array.
    Array,
    /// A table.
    Table,
}

impl ValueKind {
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            Value::Integer(_) => Self::Integer,
            Value::Float(_) => Self::Float,
            Value::Boolean(_) => Self::Boolean,
            Value::Datetime(_) => Self::Datetime,
            Value::Array(_) => Self::Array,
            Value::Table(_) => Self::Table,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Array => "array",
            Self::Table => "table",
        };
        f.write_str(name)
    }
}

/// Parsed configuration document with typed lookups.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    root: Table,
}

impl ConfigDocument {
    /// Reads and parses the document at `path`.
    ///
    /// An empty file is a valid document in which every key is absent.
    pub fn load(path: &Utf8Path) -> Result<Self, DocumentError> {
        let contents = fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| DocumentError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Parses a document held in memory.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let root = contents.parse::<Table>()?;
        Ok(Self { root })
    }

    /// Looks up an integer.
    #[must_use]
    pub fn integer(&self, key: &str) -> Lookup<i64> {
        lookup(&self.root, key, Value::as_integer)
    }

    /// Looks up a boolean.
    #[must_use]
    pub fn boolean(&self, key: &str) -> Lookup<bool> {
        lookup(&self.root, key, Value::as_bool)
    }

    /// Looks up a string.
    #[must_use]
    pub fn string(&self, key: &str) -> Lookup<&str> {
        lookup(&self.root, key, Value::as_str)
    }

    /// Looks up an array of arbitrary values.
    #[must_use]
    pub fn array(&self, key: &str) -> Lookup<&[Value]> {
        lookup(&self.root, key, |value| value.as_array().map(Vec::as_slice))
    }
}

pub(crate) fn lookup<'a, T>(
    table: &'a Table,
    key: &str,
    extract: impl FnOnce(&'a Value) -> Option<T>,
) -> Lookup<T> {
    match table.get(key) {
        None => Lookup::Absent,
        Some(value) => match extract(value) {
            Some(found) => Lookup::Found(found),
            None => Lookup::Mismatched {
                found: ValueKind::of(value),
            },
        },
    }
}
