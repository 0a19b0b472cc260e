//! Error types for the Azure Resource Manager layer.
//!
//! Three families live here:
//!
//! - [`CloudError`]: the control plane rejected a request. Execution functions
//!   turn this into an `{"error": ...}` mapping instead of failing.
//! - [`ModelError`]: a request body could not be built from keyword arguments.
//!   This is also reported as data.
//! - [`AuthError`] and [`ArmError`]: credential and transport failures, which
//!   propagate to the caller.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// An error returned by Azure Resource Manager.
///
/// The `Display` form matches the text callers expect to find in the
/// `error` key of a failed result, e.g.
/// `Azure Error: ResourceNotFound\nMessage: The Resource ... was not found.`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudError {
    /// HTTP status, when the error came from a response
    pub status: Option<u16>,
    /// ARM error code (`ResourceNotFound`, `InvalidRequestFormat`, ...)
    pub code: String,
    /// Human readable message
    pub message: String,
}

impl CloudError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Parse an ARM error envelope.
    ///
    /// Accepts both `{"error": {"code", "message"}}` and the bare
    /// `{"code", "message"}` form some long-running operation endpoints return.
    /// Anything else becomes an `HttpError{status}` carrying the raw text.
    pub fn from_body(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: Option<Inner>,
            code: Option<String>,
            message: Option<String>,
        }

        #[derive(Deserialize)]
        struct Inner {
            code: Option<String>,
            message: Option<String>,
        }

        if let Ok(envelope) = serde_json::from_str::<Envelope>(body) {
            if let Some(inner) = envelope.error {
                return Self {
                    status: Some(status),
                    code: inner.code.unwrap_or_else(|| format!("HttpError{}", status)),
                    message: inner.message.unwrap_or_default(),
                };
            }
            if envelope.code.is_some() || envelope.message.is_some() {
                return Self {
                    status: Some(status),
                    code: envelope.code.unwrap_or_else(|| format!("HttpError{}", status)),
                    message: envelope.message.unwrap_or_default(),
                };
            }
        }

        Self {
            status: Some(status),
            code: format!("HttpError{}", status),
            message: body.trim().to_string(),
        }
    }

    /// Parse the `error` member of a long-running operation status body.
    pub fn from_operation(value: &serde_json::Value, status: &str) -> Self {
        let error = value.get("error").unwrap_or(value);
        let code = error
            .get("code")
            .and_then(|c| c.as_str())
            .unwrap_or(status)
            .to_string();
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| format!("Long running operation finished with status '{}'", status));
        Self::new(code, message)
    }

    /// Whether this error means the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404) || self.code.ends_with("NotFound")
    }
}

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Azure Error: {}\nMessage: {}", self.code, self.message)
    }
}

impl std::error::Error for CloudError {}

/// Failure to turn keyword arguments into a request body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    /// Unknown model or a required attribute is missing
    #[error("The object model could not be built. ({0})")]
    Build(String),

    /// A value does not fit the attribute's type
    #[error("The object model could not be parsed. ({0})")]
    Parse(String),
}

/// Credential and client construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("A subscription_id must be specified")]
    MissingSubscription,

    #[error("The {0} cloud environment is not recognized")]
    UnknownCloud(String),

    #[error("Failed to acquire a token from {authority}: {message}")]
    TokenRequest {
        /// Token endpoint that was contacted
        authority: String,
        /// Error description returned by the endpoint, or the transport error
        message: String,
    },

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

/// Everything that can go wrong while sending an ARM request.
#[derive(Debug, Clone, Error)]
pub enum ArmError {
    /// The provider rejected the request
    #[error(transparent)]
    Cloud(#[from] CloudError),

    /// Network or protocol failure below the API
    #[error("Request failed: {0}")]
    Transport(String),

    /// No usable credential
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<reqwest::Error> for ArmError {
    fn from(e: reqwest::Error) -> Self {
        ArmError::Transport(e.to_string())
    }
}

impl From<url::ParseError> for ArmError {
    fn from(e: url::ParseError) -> Self {
        ArmError::Transport(format!("invalid request URL: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_error_display() {
        let err = CloudError::new("ResourceNotFound", "The Resource 'vnet1' was not found.");
        assert_eq!(
            err.to_string(),
            "Azure Error: ResourceNotFound\nMessage: The Resource 'vnet1' was not found."
        );
    }

    #[test]
    fn test_cloud_error_from_envelope() {
        let body = r#"{"error":{"code":"AuthorizationFailed","message":"nope"}}"#;
        let err = CloudError::from_body(403, body);
        assert_eq!(err.code, "AuthorizationFailed");
        assert_eq!(err.message, "nope");
        assert_eq!(err.status, Some(403));
    }

    #[test]
    fn test_cloud_error_from_bare_and_raw_body() {
        let bare = CloudError::from_body(400, r#"{"code":"BadRequest","message":"bad"}"#);
        assert_eq!(bare.code, "BadRequest");

        let raw = CloudError::from_body(502, "Bad Gateway");
        assert_eq!(raw.code, "HttpError502");
        assert_eq!(raw.message, "Bad Gateway");
    }

    #[test]
    fn test_not_found_detection() {
        assert!(CloudError::from_body(404, "").is_not_found());
        assert!(CloudError::new("ParentResourceNotFound", "x").is_not_found());
        assert!(!CloudError::new("Conflict", "x").is_not_found());
    }

    #[test]
    fn test_model_error_messages() {
        assert_eq!(
            ModelError::Build("missing required attribute 'access'".into()).to_string(),
            "The object model could not be built. (missing required attribute 'access')"
        );
        assert_eq!(
            ModelError::Parse("x".into()).to_string(),
            "The object model could not be parsed. (x)"
        );
    }
}
