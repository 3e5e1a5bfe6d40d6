//! Structured telemetry initialisation for the daemon.
//!
//! Two backends are supported. The stdout backend writes human-readable
//! lines with timestamps, sending warnings and errors to stderr. The syslog
//! backend hands each formatted line to the system logger at the priority
//! matching the event level, leaving timestamps to syslog.

use std::ffi::CString;
use std::io::{self, IsTerminal, Write};

use bootstrapd_config::LogBackend;
use once_cell::sync::OnceCell;
use tracing::{Level, Metadata, Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter, writer::MakeWriterExt};

static TELEMETRY_GUARD: OnceCell<LogBackend> = OnceCell::new();

const DEFAULT_FILTER: &str = "info";
const SYSLOG_IDENTITY: &std::ffi::CStr = c"bootstrapd";

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    backend: LogBackend,
}

impl TelemetryHandle {
    /// Backend installed by the first successful initialisation.
    #[must_use]
    pub const fn backend(self) -> LogBackend {
        self.backend
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the `RUST_LOG` filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent and report the backend installed first.
pub fn initialise(backend: LogBackend) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(backend).map(|()| backend))
        .map(|installed| TelemetryHandle {
            backend: *installed,
        })
}

fn env_filter() -> Result<EnvFilter, TelemetryError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => {
            EnvFilter::try_new(directives).map_err(|error| TelemetryError::Filter(error.to_string()))
        }
        Err(_) => Ok(EnvFilter::new(DEFAULT_FILTER)),
    }
}

fn install_subscriber(backend: LogBackend) -> Result<(), TelemetryError> {
    let filter = env_filter()?;
    let subscriber: Box<dyn Subscriber + Send + Sync> = match backend {
        LogBackend::Stdout => {
            let writer = io::stderr
                .with_max_level(Level::WARN)
                .or_else(io::stdout);
            Box::new(
                fmt::Subscriber::builder()
                    .with_env_filter(filter)
                    .with_target(true)
                    .with_level(true)
                    .with_writer(writer)
                    .with_ansi(io::stdout().is_terminal())
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .finish(),
            )
        }
        LogBackend::Syslog => {
            SyslogWriter::open();
            Box::new(
                fmt::Subscriber::builder()
                    .with_env_filter(filter)
                    .with_target(true)
                    .with_level(false)
                    .with_writer(SyslogWriter)
                    .with_ansi(false)
                    .without_time()
                    .finish(),
            )
        }
    };
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

/// Maps tracing levels onto syslog priorities.
#[must_use]
pub fn syslog_priority(level: Level) -> libc::c_int {
    match level {
        Level::ERROR => libc::LOG_ERR,
        Level::WARN => libc::LOG_WARNING,
        Level::INFO => libc::LOG_INFO,
        Level::DEBUG | Level::TRACE => libc::LOG_DEBUG,
    }
}

#[derive(Debug, Clone, Copy)]
struct SyslogWriter;

impl SyslogWriter {
    fn open() {
        // SAFETY: the identity is a static C string that outlives the
        // connection to the system logger.
        unsafe { libc::openlog(SYSLOG_IDENTITY.as_ptr(), libc::LOG_PID, libc::LOG_DAEMON) };
    }
}

impl<'a> MakeWriter<'a> for SyslogWriter {
    type Writer = SyslogLine;

    fn make_writer(&'a self) -> Self::Writer {
        SyslogLine::new(libc::LOG_INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        SyslogLine::new(syslog_priority(*meta.level()))
    }
}

/// Buffers one formatted event and submits it to syslog when dropped.
#[derive(Debug)]
struct SyslogLine {
    priority: libc::c_int,
    buffer: Vec<u8>,
}

impl SyslogLine {
    const fn new(priority: libc::c_int) -> Self {
        Self {
            priority,
            buffer: Vec::new(),
        }
    }
}

impl Write for SyslogLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SyslogLine {
    fn drop(&mut self) {
        let mut message = std::mem::take(&mut self.buffer);
        message.retain(|byte| *byte != 0);
        while message.last() == Some(&b'\n') {
            message.pop();
        }
        if message.is_empty() {
            return;
        }
        let Ok(message) = CString::new(message) else {
            return;
        };
        // SAFETY: both the format string and the message are valid
        // NUL-terminated strings; the message is passed as an argument so
        // `%` sequences in it are not interpreted.
        unsafe { libc::syslog(self.priority, c"%s".as_ptr(), message.as_ptr()) };
    }
}
