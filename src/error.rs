//! Error handling for reading and retrieving solar data.
//!
//! Four kinds matter to callers: the resource could not be read (`Io`),
//! its content does not match the expected format (`Format`), the remote
//! service could not be reached (`Network`), or the service rejected the
//! request (`Service`). The remaining variants cover caller mistakes,
//! configuration and output export.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all reader, fetcher and export operations
#[derive(Error, Debug)]
pub enum Error {
    /// Resource unreachable or unreadable
    #[error("I/O error for '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content does not match the expected schema
    #[error("Invalid {format} data{}: {reason}", line_suffix(.line))]
    Format {
        format: String,
        line: Option<usize>,
        reason: String,
    },

    /// Transport-level failure reaching a remote service
    #[error("Network error contacting {service}: {source}")]
    Network {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    /// Remote service reachable but rejected the request
    #[error("{service} rejected the request{}: {message}", status_suffix(.status))]
    Service {
        service: String,
        status: Option<u16>,
        message: String,
    },

    /// Invalid arguments supplied by the caller
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration file or environment problem
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Failure converting or writing output tables
    #[error("Export error: {message}")]
    Export {
        message: String,
        #[source]
        source: Option<polars::error::PolarsError>,
    },
}

/// Coarse error taxonomy, independent of the variant payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    Network,
    Service,
    Validation,
    Configuration,
    Export,
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {}", l)).unwrap_or_default()
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl Error {
    /// Create an I/O error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a format error without line information
    pub fn format(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            format: format.into(),
            line: None,
            reason: reason.into(),
        }
    }

    /// Create a format error pointing at a 1-based line
    pub fn format_at(format: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            format: format.into(),
            line: Some(line),
            reason: reason.into(),
        }
    }

    /// Create a network error
    pub fn network(service: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            service: service.into(),
            source,
        }
    }

    /// Create a service error
    pub fn service(
        service: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an export error
    pub fn export(message: impl Into<String>, source: Option<polars::error::PolarsError>) -> Self {
        Self::Export {
            message: message.into(),
            source,
        }
    }

    /// Taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Format { .. } => ErrorKind::Format,
            Self::Network { .. } => ErrorKind::Network,
            Self::Service { .. } => ErrorKind::Service,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Export { .. } => ErrorKind::Export,
        }
    }

    /// Attach a line number to a format error that has none yet
    pub fn with_line(self, line: usize) -> Self {
        match self {
            Self::Format {
                format,
                line: None,
                reason,
            } => Self::Format {
                format,
                line: Some(line),
                reason,
            },
            other => other,
        }
    }
}

impl From<polars::error::PolarsError> for Error {
    fn from(error: polars::error::PolarsError) -> Self {
        Self::Export {
            message: "Polars operation failed".to_string(),
            source: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_display_includes_line() {
        let err = Error::format_at("TMY3", 3, "expected 68 fields, found 12");
        assert_eq!(
            err.to_string(),
            "Invalid TMY3 data at line 3: expected 68 fields, found 12"
        );
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_with_line_only_fills_missing_line() {
        let err = Error::format("EPW", "bad value").with_line(10);
        assert!(matches!(err, Error::Format { line: Some(10), .. }));

        let err = Error::format_at("EPW", 2, "bad value").with_line(10);
        assert!(matches!(err, Error::Format { line: Some(2), .. }));
    }

    #[test]
    fn test_service_error_display() {
        let err = Error::service("PVGIS", Some(400), "Location over the sea");
        assert_eq!(
            err.to_string(),
            "PVGIS rejected the request (HTTP 400): Location over the sea"
        );
        assert_eq!(err.kind(), ErrorKind::Service);
    }
}
