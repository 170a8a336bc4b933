//! Error types for the RxFlow submission engine.
//!
//! This module defines a hierarchy of error types following best practices:
//!
//! - [`TransportError`] - Remote delivery errors (network, server, rejection)
//! - [`ControllerError`] - Controller usage errors (caller-facing, never user-facing)
//! - [`ConfigError`] - Environment configuration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! User-displayable text comes from [`TransportError::user_message`] and from
//! validation rule messages; everything else stays between the engine and the
//! calling code.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors reported by a transport collaborator while delivering a submission.
///
/// Every variant maps to a `Failed` resting state on the controller; none of
/// them is terminal for the controller itself, since the caller may re-submit.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request could not be performed at all.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The destination answered with a non-success status.
    #[error("destination returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The destination answered, but not with the JSON body we expect.
    #[error("invalid response from destination: {0}")]
    InvalidResponse(String),

    /// The request timed out at the transport layer.
    #[error("request timed out")]
    Timeout,

    /// The destination understood the request and refused it.
    #[error("{0}")]
    Rejected(String),

    /// No route is configured for the requested destination.
    #[error("unknown destination: {0}")]
    UnknownDestination(String),
}

impl TransportError {
    /// The message shown to the end user when this failure becomes a
    /// `Failed` state.
    ///
    /// Prefers the structured message carried by the failure; falls back to
    /// the display form of the variant.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Rejected(message) => message.clone(),
            TransportError::Status { message, .. } if !message.is_empty() => message.clone(),
            TransportError::Status { status, .. } => {
                format!("destination returned status {status}")
            }
            other => other.to_string(),
        }
    }
}

// =============================================================================
// Controller Errors
// =============================================================================

/// Usage errors returned by [`crate::controller::SubmissionController`].
///
/// These are reported to the calling code only. They never become part of
/// the controller's `SubmissionState`, and the state is left untouched when
/// one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// `submit` was called while a submission was already in flight.
    #[error("a submission is already in flight for this controller")]
    AlreadyPending,

    /// `reset` was called while a submission was in flight.
    #[error("cannot reset while a submission is in flight")]
    ResetWhilePending,

    /// The controller's owning surface was torn down; it no longer accepts
    /// submissions.
    #[error("controller is detached from its surface")]
    Detached,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading engine configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable is set but cannot be parsed.
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: &'static str, message: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_structured_message() {
        let err = TransportError::Status {
            status: 502,
            message: "storage offline".into(),
        };
        assert_eq!(err.user_message(), "storage offline");

        let err = TransportError::Rejected("pharmacy already registered".into());
        assert_eq!(err.user_message(), "pharmacy already registered");
    }

    #[test]
    fn test_user_message_falls_back_to_display() {
        let err = TransportError::Status {
            status: 503,
            message: String::new(),
        };
        assert!(err.user_message().contains("503"));

        let err = TransportError::Timeout;
        assert_eq!(err.user_message(), "request timed out");
    }

    #[test]
    fn test_controller_error_format() {
        assert!(ControllerError::AlreadyPending
            .to_string()
            .contains("already in flight"));
        assert!(ControllerError::Detached.to_string().contains("detached"));
    }

    #[test]
    fn test_config_error_names_the_variable() {
        let err = ConfigError::InvalidValue {
            var: "RXFLOW_PORT",
            message: "invalid digit found in string".into(),
        };
        assert!(err.to_string().contains("RXFLOW_PORT"));
    }
}
