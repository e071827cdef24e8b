//! Error taxonomy for the gateway.
//!
//! Every failure a caller can see is a [`GatewayError`]. Upstream HTTP
//! statuses that have a well-defined meaning are classified up front and
//! short-circuit the retry loop; everything else is an [`AttemptFailure`]
//! that the retry policy may try again.

use thiserror::Error;

use crate::transport::TransportError;

/// Fieldless mirror of [`GatewayError`] for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    CityNotFound,
    InvalidCredentials,
    RateLimited,
    ServiceUnavailable,
    NetworkFailure,
    MalformedResponse,
    Unknown,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::CityNotFound => "city_not_found",
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Unknown => "unknown",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed attempt that the retry loop is allowed to repeat.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl AttemptFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            AttemptFailure::Status { status, .. } => Some(*status),
            AttemptFailure::Transport(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Rejected locally before any network call.
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{message}")]
    CityNotFound { message: String, status: Option<u16> },

    #[error("{message}")]
    InvalidCredentials { message: String, status: Option<u16> },

    #[error("{message}")]
    RateLimited { message: String, status: Option<u16> },

    #[error("{message}")]
    ServiceUnavailable { message: String, status: Option<u16> },

    #[error("{message}")]
    NetworkFailure {
        message: String,
        status: Option<u16>,
        #[source]
        cause: AttemptFailure,
    },

    #[error("{message}")]
    MalformedResponse { message: String, status: Option<u16> },

    #[error("{message}")]
    Unknown { message: String, status: Option<u16> },

    /// The caller's cancellation token fired before the call completed.
    #[error("Request was cancelled")]
    Cancelled,
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        GatewayError::MalformedResponse { message: message.into(), status: None }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation(_) => ErrorKind::Validation,
            GatewayError::CityNotFound { .. } => ErrorKind::CityNotFound,
            GatewayError::InvalidCredentials { .. } => ErrorKind::InvalidCredentials,
            GatewayError::RateLimited { .. } => ErrorKind::RateLimited,
            GatewayError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            GatewayError::NetworkFailure { .. } => ErrorKind::NetworkFailure,
            GatewayError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            GatewayError::Unknown { .. } => ErrorKind::Unknown,
            GatewayError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Upstream HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::CityNotFound { status, .. }
            | GatewayError::InvalidCredentials { status, .. }
            | GatewayError::RateLimited { status, .. }
            | GatewayError::ServiceUnavailable { status, .. }
            | GatewayError::NetworkFailure { status, .. }
            | GatewayError::MalformedResponse { status, .. }
            | GatewayError::Unknown { status, .. } => *status,
            GatewayError::Validation(_) | GatewayError::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }

    /// Short text suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Validation(msg) => msg.clone(),
            GatewayError::CityNotFound { message, .. } => message.clone(),
            GatewayError::InvalidCredentials { .. } => {
                "The weather service rejected the API key. Check your configuration.".to_string()
            }
            GatewayError::RateLimited { .. } => {
                "Too many requests to the weather service. Please wait a moment and try again."
                    .to_string()
            }
            GatewayError::ServiceUnavailable { .. } => {
                "The weather service is temporarily unavailable.".to_string()
            }
            GatewayError::NetworkFailure { .. } => {
                "Could not reach the weather service. Check your connection.".to_string()
            }
            GatewayError::MalformedResponse { .. } => {
                "The weather service returned data we could not understand.".to_string()
            }
            GatewayError::Unknown { .. } => "An unexpected error occurred.".to_string(),
            GatewayError::Cancelled => "The request was cancelled.".to_string(),
        }
    }
}

/// Map an upstream status with a fixed meaning to its error.
///
/// `subject` names what was queried (a city or a search text) and ends up in
/// the not-found message. Returns `None` for statuses that should go through
/// the generic retry path.
pub fn classify_status(status: u16, body: &str, subject: &str) -> Option<GatewayError> {
    let status_code = Some(status);
    match status {
        404 => Some(GatewayError::CityNotFound {
            message: format!("City '{subject}' was not found"),
            status: status_code,
        }),
        401 => Some(GatewayError::InvalidCredentials {
            message: format!("Weather API rejected the API key: {}", truncate_body(body)),
            status: status_code,
        }),
        429 => Some(GatewayError::RateLimited {
            message: "Weather API rate limit exceeded".to_string(),
            status: status_code,
        }),
        503 => Some(GatewayError::ServiceUnavailable {
            message: "Weather API is temporarily unavailable".to_string(),
            status: status_code,
        }),
        _ => None,
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
