//! Logging configuration for flightlog.
//!
//! Logs always go to the console. When a log file is configured they are also
//! appended to it through a non-blocking writer.

use std::path::Path;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress all output except errors.
    Quiet,
    /// Normal output level (info and above).
    #[default]
    Normal,
    /// Verbose output (debug and above).
    Verbose,
    /// Very verbose output (trace level).
    Trace,
}

impl Verbosity {
    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Default filter directives for this verbosity.
    #[must_use]
    pub fn default_directives(&self) -> String {
        let level = self.to_level_filter();
        format!("flightlog={level},ofl={level},tower_http={level}")
    }
}

/// Keeps the file writer alive; pending lines are flushed on drop.
#[derive(Debug)]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize the logging system.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `verbosity`. Calling it again leaves the first subscriber
/// in place.
///
/// # Errors
///
/// Returns an error if the log file's directory cannot be created.
///
/// # Examples
///
/// ```no_run
/// use flightlog::{init_logging, logging::Verbosity};
///
/// let _guard = init_logging(Verbosity::Verbose, None).unwrap();
/// ```
pub fn init_logging(verbosity: Verbosity, log_file: Option<&Path>) -> Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directives()));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_appender(path)?);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(file_layer);

    // Install the subscriber (ignore error if already set)
    let _ = subscriber.try_init();

    Ok(LoggingGuard { _file: guard })
}

/// A never-rotating appender writing to `path`.
fn open_appender(path: &Path) -> Result<tracing_appender::rolling::RollingFileAppender> {
    let file_name = path.file_name().ok_or_else(|| Error::ConfigValidation {
        message: format!("log file {} has no file name", path.display()),
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(tracing_appender::rolling::never(dir, file_name))
}

/// Initialize logging for tests.
///
/// This sets up a minimal logging configuration suitable for tests.
/// It only logs warnings and errors by default to keep test output clean.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_to_level() {
        assert_eq!(Verbosity::Quiet.to_level_filter(), Level::ERROR);
        assert_eq!(Verbosity::Normal.to_level_filter(), Level::INFO);
        assert_eq!(Verbosity::Verbose.to_level_filter(), Level::DEBUG);
        assert_eq!(Verbosity::Trace.to_level_filter(), Level::TRACE);
    }

    #[test]
    fn test_verbosity_default() {
        assert_eq!(Verbosity::default(), Verbosity::Normal);
    }

    #[test]
    fn test_default_directives() {
        let directives = Verbosity::Verbose.default_directives();
        assert!(directives.contains("flightlog=DEBUG"));
        assert!(directives.contains("tower_http=DEBUG"));
    }

    #[test]
    fn test_open_appender_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("ofl_app.log");

        open_appender(&path).unwrap();
        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn test_open_appender_requires_file_name() {
        let err = open_appender(Path::new("/")).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_init_logging_does_not_panic() {
        // Only the first subscriber in the test binary is installed; later calls are no-ops.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ofl_app.log");
        let guard = init_logging(Verbosity::Normal, Some(&path)).unwrap();
        drop(guard);

        init_logging(Verbosity::Quiet, None).unwrap();
    }

    #[test]
    fn test_init_test_logging_does_not_panic() {
        init_test_logging();
    }
}
