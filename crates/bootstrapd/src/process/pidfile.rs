//! PID file creation and recording.

use std::fs::{File, OpenOptions};
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::LaunchError;

/// Warns when a readable PID file already exists at `path`.
///
/// Another instance may be running, but the launch continues regardless.
pub(super) fn warn_if_present(path: &Utf8Path) -> bool {
    let present = File::open(path).is_ok();
    if present {
        warn!(
            target: PROCESS_TARGET,
            file = %path,
            "pid file already exists, another instance may be running"
        );
    }
    present
}

/// PID file opened in append mode before forking.
#[derive(Debug)]
pub(super) struct PidFile {
    path: Utf8PathBuf,
    file: File,
}

impl PidFile {
    pub(super) fn open(path: &Utf8Path) -> Result<Self, LaunchError> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|source| LaunchError::PidOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Records the child's process id in decimal, without a newline.
    pub(super) fn write_pid(mut self, pid: i32) -> Result<(), LaunchError> {
        write!(self.file, "{pid}")
            .and_then(|()| self.file.flush())
            .map_err(|source| LaunchError::PidWrite {
                path: self.path.clone(),
                source,
            })?;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %self.path,
            "forked successfully"
        );
        Ok(())
    }
}
