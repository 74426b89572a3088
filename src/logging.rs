//! Log setup. The terminal belongs to the user interface, so records go to a
//! file.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use env_logger::{Builder, Env, Target};

/// Represents desired logging verbosity level
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LogLevel {
    /// Report only errors. Corresponds to zero verbosity flags.
    Error = 0,

    /// Report warning messages and errors.
    /// Corresponds to a single `-v` verbosity flag.
    Warn,

    /// Report general information messages, warnings and errors.
    /// Corresponds to a double `-vv` verbosity flag.
    Info,

    /// Report debugging information and all non-trace messages.
    /// Corresponds to triple `-vvv` verbosity flag.
    Debug,

    /// Print all possible messages including tracing information.
    /// Corresponds to quadruple `-vvvv` verbosity flag.
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

impl From<u8> for LogLevel {
    fn from(val: u8) -> Self {
        Self::from_verbosity_flag_count(val)
    }
}

impl LogLevel {
    /// Constructs enum value from a given number of verbosity flags
    pub fn from_verbosity_flag_count(level: u8) -> Self {
        match level {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Installs the logger, appending to `log_file`. `RUST_LOG` takes
    /// precedence over the verbosity flags.
    pub fn apply(&self, log_file: &Path) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(log_file)?;
        Builder::from_env(Env::default().default_filter_or(self.to_string()))
            .target(Target::Pipe(Box::new(file)))
            .try_init()
            .map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(LogLevel::from(0), LogLevel::Error);
        assert_eq!(LogLevel::from(2), LogLevel::Info);
        assert_eq!(LogLevel::from(9), LogLevel::Trace);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_apply_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tixmarket.log");
        // Another test may have installed the logger already.
        let _ = LogLevel::Info.apply(&path);
        assert!(path.exists());
    }

    #[test]
    fn test_apply_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("tixmarket.log");
        assert!(LogLevel::Warn.apply(&path).is_err());
    }
}
