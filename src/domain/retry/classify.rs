//! Error classification for retry decisions

use crate::domain::error::TransportErrorKind;
use crate::domain::DomainError;

/// Whether a failure is worth another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    Permanent,
}

/// Classify a failure
///
/// Retryable: connection reset/aborted/refused, timeouts, HTTP 429, HTTP
/// 5xx, and responses explicitly marked temporary. Everything else is
/// permanent.
pub fn classify(error: &DomainError) -> ErrorClass {
    match error {
        DomainError::Transport { kind, .. } => match kind {
            TransportErrorKind::ConnectionReset
            | TransportErrorKind::ConnectionAborted
            | TransportErrorKind::ConnectionRefused
            | TransportErrorKind::TimedOut => ErrorClass::Retryable,
            TransportErrorKind::Other => ErrorClass::Permanent,
        },
        DomainError::Timeout { .. } => ErrorClass::Retryable,
        DomainError::Http {
            status, temporary, ..
        } => {
            if *temporary || *status == 429 || (500..600).contains(status) {
                ErrorClass::Retryable
            } else {
                ErrorClass::Permanent
            }
        }
        DomainError::Validation { .. }
        | DomainError::Configuration { .. }
        | DomainError::Decode { .. }
        | DomainError::Internal { .. } => ErrorClass::Permanent,
    }
}

impl DomainError {
    pub fn is_retryable(&self) -> bool {
        classify(self) == ErrorClass::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors() {
        let reset = DomainError::transport(TransportErrorKind::from_code("ECONNRESET"), "reset");
        let timed_out = DomainError::transport(TransportErrorKind::TimedOut, "slow");
        let other = DomainError::transport(TransportErrorKind::Other, "tls handshake");

        assert_eq!(classify(&reset), ErrorClass::Retryable);
        assert_eq!(classify(&timed_out), ErrorClass::Retryable);
        assert_eq!(classify(&other), ErrorClass::Permanent);
    }

    #[test]
    fn test_http_statuses() {
        assert!(DomainError::http(429, "slow down").is_retryable());
        assert!(DomainError::http(500, "boom").is_retryable());
        assert!(DomainError::http(503, "unavailable").is_retryable());
        assert!(!DomainError::http(400, "bad request").is_retryable());
        assert!(!DomainError::http(401, "unauthorized").is_retryable());
        assert!(!DomainError::http(404, "missing").is_retryable());
    }

    #[test]
    fn test_temporary_marker_overrides_status() {
        assert!(DomainError::temporary_http(409, "index rebuilding").is_retryable());
    }

    #[test]
    fn test_timeouts_are_retryable() {
        assert!(DomainError::timeout(30000).is_retryable());
    }

    #[test]
    fn test_programming_errors_are_permanent() {
        assert!(!DomainError::validation("bad pattern").is_retryable());
        assert!(!DomainError::decode("unexpected field").is_retryable());
        assert!(!DomainError::internal("bug").is_retryable());
        assert!(!DomainError::configuration("missing url").is_retryable());
    }
}
