use std::fmt;
use std::io;

use thiserror::Error;

/// Transport-level failure kinds reported by candidate sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionReset,
    ConnectionAborted,
    ConnectionRefused,
    TimedOut,
    Other,
}

impl TransportErrorKind {
    /// Map a socket-style error code (e.g. `ECONNRESET`) to a kind
    pub fn from_code(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "ECONNRESET" => Self::ConnectionReset,
            "ECONNABORTED" => Self::ConnectionAborted,
            "ECONNREFUSED" => Self::ConnectionRefused,
            "ETIMEDOUT" | "ESOCKETTIMEDOUT" => Self::TimedOut,
            _ => Self::Other,
        }
    }

    /// Map an I/O error kind to a transport kind
    pub fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::ConnectionReset => Self::ConnectionReset,
            io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe => {
                Self::ConnectionAborted
            }
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            io::ErrorKind::TimedOut => Self::TimedOut,
            _ => Self::Other,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionReset => "ECONNRESET",
            Self::ConnectionAborted => "ECONNABORTED",
            Self::ConnectionRefused => "ECONNREFUSED",
            Self::TimedOut => "ETIMEDOUT",
            Self::Other => "EOTHER",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Core domain errors
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },

    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Upstream HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        temporary: bool,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(elapsed_ms: u64) -> Self {
        Self::Timeout { elapsed_ms }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            temporary: false,
        }
    }

    /// An upstream failure explicitly flagged as temporary by the remote side
    pub fn temporary_http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            temporary: true,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<io::Error> for DomainError {
    fn from(error: io::Error) -> Self {
        Self::transport(TransportErrorKind::from_io_kind(error.kind()), error.to_string())
    }
}
