//! Scenario world for the launch sequence suites.

use std::fmt::Write as _;
use std::fs;
use std::sync::Arc;

use bootstrapd_config::{LogBackend, Settings};
use camino::Utf8PathBuf;
use tempfile::TempDir;

use crate::process::launch::{LaunchInputs, LaunchPlan, ProcessControl, ServiceDeps, launch_with};
use crate::process::{LaunchError, Launched};

use super::daemonizer::RecordingDaemonizer;
use super::engines::FakeEngines;
use super::reporter::RecordingLifecycleReporter;

/// Public key of the seed node written into generated configurations.
pub const SEED_PUBLIC_KEY: &str =
    "951C88B7E75C867418ACDB5D273821372BB5BD652740BCDF623A4FA293E75D2F";

/// Launch scenario state shared across steps.
pub struct LaunchWorld {
    dir: TempDir,
    settings: Vec<String>,
    pub engines: FakeEngines,
    pub daemonizer: RecordingDaemonizer,
    pub reporter: Arc<RecordingLifecycleReporter>,
    pub log_backend: LogBackend,
    pub pid_file: Option<Utf8PathBuf>,
    outcome: Option<Result<Launched<FakeEngines>, LaunchError>>,
}

impl LaunchWorld {
    /// Builds a world whose fork lands in the child.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create scenario directory"),
            settings: Vec::new(),
            engines: FakeEngines::default(),
            daemonizer: RecordingDaemonizer::child(),
            reporter: Arc::new(RecordingLifecycleReporter::default()),
            log_backend: LogBackend::Syslog,
            pid_file: None,
            outcome: None,
        }
    }

    /// Adds a raw top-level `key = value` line to the configuration.
    pub fn set(&mut self, line: impl Into<String>) {
        self.settings.push(line.into());
    }

    /// Path of a file inside the scenario directory.
    #[must_use]
    pub fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name)).expect("scenario path is UTF-8")
    }

    /// PID file configured for the scenario.
    #[must_use]
    pub fn pid_path(&self) -> Utf8PathBuf {
        self.pid_file
            .clone()
            .unwrap_or_else(|| self.path("bootstrapd.pid"))
    }

    /// Keys file configured for the scenario.
    #[must_use]
    pub fn keys_path(&self) -> Utf8PathBuf {
        self.path("bootstrapd.keys")
    }

    fn render_config(&self) -> String {
        let mut document = String::new();
        writeln!(document, "pid_file_path = '{}'", self.pid_path()).expect("write config");
        writeln!(document, "keys_file_path = '{}'", self.keys_path()).expect("write config");
        for line in &self.settings {
            writeln!(document, "{line}").expect("write config");
        }
        writeln!(document).expect("write config");
        writeln!(document, "[[bootstrap_nodes]]").expect("write config");
        writeln!(document, "address = \"198.51.100.7\"").expect("write config");
        writeln!(document, "port = 33445").expect("write config");
        writeln!(document, "public_key = \"{SEED_PUBLIC_KEY}\"").expect("write config");
        document
    }

    /// Writes the configuration and runs the launch sequence once.
    pub fn launch(&mut self) {
        let config_path = self.path("bootstrapd.toml");
        fs::write(&config_path, self.render_config()).expect("write config file");
        let settings = Settings::load(&config_path).expect("scenario config should resolve");
        let plan = LaunchPlan {
            inputs: LaunchInputs {
                settings: &settings,
                config_path: &config_path,
                log_backend: self.log_backend,
            },
            process: ProcessControl {
                daemonizer: self.daemonizer.clone(),
            },
            services: ServiceDeps {
                engines: self.engines.clone(),
                reporter: Arc::clone(&self.reporter),
            },
        };
        self.outcome = Some(launch_with(plan));
    }

    /// Result of the last launch.
    #[must_use]
    pub fn outcome(&self) -> Option<&Result<Launched<FakeEngines>, LaunchError>> {
        self.outcome.as_ref()
    }
}

impl Default for LaunchWorld {
    fn default() -> Self {
        Self::new()
    }
}
