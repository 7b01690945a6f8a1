//! Error types for transport operations.
//!
//! Everything that can go wrong talking to a CalDAV server ends up as a
//! [`TransportError`]. The sync pipeline never retries; callers can use
//! [`TransportError::is_retryable`] to decide for themselves.

use std::fmt;
use thiserror::Error;

/// The category of a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorCode {
    /// Credentials were rejected (401).
    AuthenticationFailed,
    /// The user lacks permission (403).
    AuthorizationFailed,
    /// The connection failed or timed out.
    NetworkError,
    /// Too many requests (429).
    RateLimited,
    /// Server returned a 5xx status.
    ServerError,
    /// The response could not be understood.
    InvalidResponse,
    /// The resource does not exist (404).
    NotFound,
    /// Missing or invalid configuration.
    ConfigurationError,
    /// Unexpected internal state.
    InternalError,
}

impl TransportErrorCode {
    /// Network failures, throttling and 5xx are transient; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns a stable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised by a [`CalendarTransport`](crate::CalendarTransport).
#[derive(Debug, Error)]
pub struct TransportError {
    code: TransportErrorCode,
    message: String,
    /// The path or URL the operation was about, if known.
    target: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// Creates a new error with the given code and message.
    pub fn new(code: TransportErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            target: None,
            source: None,
        }
    }

    /// The server rejected the credentials (401).
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::AuthenticationFailed, message)
    }

    /// The credentials lack access (403).
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::AuthorizationFailed, message)
    }

    /// The request never got a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::NetworkError, message)
    }

    /// The server asked us to slow down (429).
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::RateLimited, message)
    }

    /// The server failed (5xx).
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::ServerError, message)
    }

    /// The response could not be understood.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::InvalidResponse, message)
    }

    /// The principal, collection or object does not exist.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::NotFound, message)
    }

    /// The transport settings are unusable.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::ConfigurationError, message)
    }

    /// A bug on our side.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::InternalError, message)
    }

    /// Sets the path or URL this error is about.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// The classification.
    pub fn code(&self) -> TransportErrorCode {
        self.code
    }

    /// The human-readable detail.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the target, if set.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Shorthand for `self.code().is_retryable()`.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref target) = self.target {
            write!(f, " ({})", target)?;
        }
        Ok(())
    }
}

/// A specialized Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
