//! Identity store: loads the daemon keypair from disk or persists a new one.
//!
//! The keys file holds exactly [`KEYS_FILE_LEN`] bytes, public key first. An
//! existing file that is shorter is never replaced; doing so would silently
//! change the node's identity.

use std::fs::File;
use std::io::{self, Read, Write};

use bootstrapd_net::{IdentitySlots, KEYS_FILE_LEN, KeyPair};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use thiserror::Error;
use tracing::info;
use zeroize::Zeroizing;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

const KEYS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::keys");

/// Errors raised while loading or saving identity keys.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The keys file exists but could not be opened.
    #[error("failed to open keys file '{path}': {source}")]
    Open {
        /// Keys file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The keys file is shorter than a full keypair or could not be read.
    #[error("failed to read {expected} bytes from keys file '{path}': {source}")]
    Read {
        /// Keys file path.
        path: Utf8PathBuf,
        /// Required file length.
        expected: usize,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A new keys file could not be written.
    #[error("failed to save keys file '{path}': {source}")]
    Write {
        /// Keys file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// How [`ensure_identity`] satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Keys were read from an existing file and installed.
    Loaded,
    /// The engine's generated keys were written to a new file.
    Saved,
}

/// Makes the keypair in `slots` match the keys file at `path`.
///
/// An existing file is loaded into the engine. A missing file is created from
/// the engine's current keypair. Any other outcome is an error.
pub fn ensure_identity<S>(path: &Utf8Path, slots: &mut S) -> Result<KeyOutcome, IdentityError>
where
    S: IdentitySlots + ?Sized,
{
    match File::open(path) {
        Ok(mut file) => {
            let mut image = Zeroizing::new([0_u8; KEYS_FILE_LEN]);
            file.read_exact(&mut *image)
                .map_err(|source| IdentityError::Read {
                    path: path.to_path_buf(),
                    expected: KEYS_FILE_LEN,
                    source,
                })?;
            slots.install_keypair(KeyPair::from_file_bytes(&image));
            info!(target: KEYS_TARGET, file = %path, "keys loaded");
            Ok(KeyOutcome::Loaded)
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            let image = slots.keypair().to_file_bytes();
            atomic_write(path, &*image).map_err(|source| IdentityError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            info!(target: KEYS_TARGET, file = %path, "keys saved");
            Ok(KeyOutcome::Saved)
        }
        Err(source) => Err(IdentityError::Open {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `contents` to `path` through a synced temporary file so a partial
/// keys file never appears under the final name.
fn atomic_write(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };

    let mut builder = Builder::new();
    builder.prefix(path.file_name().unwrap_or("bootstrapd-keys"));
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        builder.permissions(Permissions::from_mode(0o600));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
