//! Implements the daemonisation backend for the `bootstrapd` process.

use std::os::fd::RawFd;

use camino::{Utf8Path, Utf8PathBuf};
use nix::errno::Errno;
use nix::sys::stat::{Mode, umask};
use nix::unistd::{ForkResult, chdir, close, fork, setsid};
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Which side of the fork the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkOutcome {
    /// The original process; `child` is the new process id.
    Parent {
        /// Process id of the child.
        child: i32,
    },
    /// The newly created process.
    Child,
}

/// Abstraction over the process-level steps of daemonisation.
pub trait Daemonizer {
    /// Forks the process.
    fn fork(&self) -> Result<ForkOutcome, DaemonizeError>;

    /// Clears the file mode mask and becomes a session leader.
    fn new_session(&self) -> Result<(), DaemonizeError>;

    /// Changes the working directory to `path`.
    fn change_workdir(&self, path: &Utf8Path) -> Result<(), DaemonizeError>;

    /// Closes stdin, stdout and stderr.
    fn close_standard_streams(&self) -> Result<(), DaemonizeError>;
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// `fork` failed.
    #[error("fork failed: {0}")]
    Fork(#[source] Errno),
    /// `setsid` failed.
    #[error("could not become a session leader: {0}")]
    Session(#[source] Errno),
    /// `chdir` failed.
    #[error("could not change working directory to '{path}': {source}")]
    Workdir {
        /// Target directory.
        path: Utf8PathBuf,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Closing a standard stream failed.
    #[error("could not close file descriptor {fd}: {source}")]
    CloseStream {
        /// Descriptor being closed.
        fd: RawFd,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}

/// Daemoniser backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDaemonizer;

impl SystemDaemonizer {
    /// Builds a new system daemoniser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Daemonizer for SystemDaemonizer {
    fn fork(&self) -> Result<ForkOutcome, DaemonizeError> {
        info!(target: PROCESS_TARGET, "forking into background");
        // SAFETY: the daemon is single-threaded when it forks, so the child
        // cannot inherit locks held by other threads.
        match unsafe { fork() }.map_err(DaemonizeError::Fork)? {
            ForkResult::Parent { child } => Ok(ForkOutcome::Parent {
                child: child.as_raw(),
            }),
            ForkResult::Child => Ok(ForkOutcome::Child),
        }
    }

    fn new_session(&self) -> Result<(), DaemonizeError> {
        umask(Mode::empty());
        setsid().map_err(DaemonizeError::Session)?;
        Ok(())
    }

    fn change_workdir(&self, path: &Utf8Path) -> Result<(), DaemonizeError> {
        chdir(path.as_std_path()).map_err(|source| DaemonizeError::Workdir {
            path: path.to_path_buf(),
            source,
        })
    }

    fn close_standard_streams(&self) -> Result<(), DaemonizeError> {
        for fd in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
            close(fd).map_err(|source| DaemonizeError::CloseStream { fd, source })?;
        }
        Ok(())
    }
}
