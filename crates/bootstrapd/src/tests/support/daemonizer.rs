//! Daemoniser double that records each step instead of touching the process.

use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use nix::errno::Errno;

use crate::process::{DaemonizeError, Daemonizer, ForkOutcome};

/// Steps requested from the daemoniser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonCall {
    /// `fork` was called.
    Fork,
    /// A new session was requested.
    NewSession,
    /// The working directory was changed.
    ChangeWorkdir(Utf8PathBuf),
    /// The standard streams were closed.
    CloseStreams,
}

/// Recording daemoniser with a scripted fork result.
#[derive(Debug, Clone)]
pub struct RecordingDaemonizer {
    outcome: ForkOutcome,
    fail_session: bool,
    calls: Arc<Mutex<Vec<DaemonCall>>>,
}

impl RecordingDaemonizer {
    /// Daemoniser whose fork lands in the parent with `child`.
    #[must_use]
    pub fn parent(child: i32) -> Self {
        Self::with_outcome(ForkOutcome::Parent { child })
    }

    /// Daemoniser whose fork lands in the child.
    #[must_use]
    pub fn child() -> Self {
        Self::with_outcome(ForkOutcome::Child)
    }

    fn with_outcome(outcome: ForkOutcome) -> Self {
        Self {
            outcome,
            fail_session: false,
            calls: Arc::default(),
        }
    }

    /// Makes `new_session` fail.
    pub fn refuse_session(&mut self) {
        self.fail_session = true;
    }

    /// Snapshot of the recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<DaemonCall> {
        self.calls.lock().expect("daemonizer mutex poisoned").clone()
    }

    fn record(&self, call: DaemonCall) {
        self.calls
            .lock()
            .expect("daemonizer mutex poisoned")
            .push(call);
    }
}

impl Daemonizer for RecordingDaemonizer {
    fn fork(&self) -> Result<ForkOutcome, DaemonizeError> {
        self.record(DaemonCall::Fork);
        Ok(self.outcome)
    }

    fn new_session(&self) -> Result<(), DaemonizeError> {
        self.record(DaemonCall::NewSession);
        if self.fail_session {
            return Err(DaemonizeError::Session(Errno::EPERM));
        }
        Ok(())
    }

    fn change_workdir(&self, path: &Utf8Path) -> Result<(), DaemonizeError> {
        self.record(DaemonCall::ChangeWorkdir(path.to_path_buf()));
        Ok(())
    }

    fn close_standard_streams(&self) -> Result<(), DaemonizeError> {
        self.record(DaemonCall::CloseStreams);
        Ok(())
    }
}
