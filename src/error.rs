//! Error types for azurearm.
//!
//! Failures reported by the service are data (`{"error": ...}` results and
//! failed state returns). The errors here are the ones that stop a command:
//! bad configuration, unreadable files, unknown functions and malformed
//! arguments.

use std::path::PathBuf;
use thiserror::Error;

use crate::azure::AuthError;
use crate::modules::ModuleError;

/// Result type alias for azurearm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for azurearm.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A configuration file could not be parsed.
    #[error("Failed to parse config file '{path}': {message}")]
    ConfigParse {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A profile named on the command line or in the defaults is missing.
    #[error("Profile '{0}' is not defined")]
    UnknownProfile(String),

    // ========================================================================
    // Input Errors
    // ========================================================================
    /// A state file is not shaped as `id: {module.function: [args]}`.
    #[error("Invalid state file '{path}': {message}")]
    StateFile {
        /// Path to the state file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A keyword argument on the command line could not be parsed.
    #[error("Invalid argument '{0}': expected key=value")]
    InvalidArgument(String),

    /// No function is registered under the name.
    #[error("Function '{0}' not found")]
    FunctionNotFound(String),

    // ========================================================================
    // Call Errors
    // ========================================================================
    /// A function aborted instead of reporting an error result.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Credentials could not be turned into a client.
    #[error(transparent)]
    Auth(#[from] AuthError),

    // ========================================================================
    // Wrapped Errors
    // ========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code for the error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Module(ModuleError::Client(_)) | Error::Auth(_) => 3,
            Error::Module(_) | Error::FunctionNotFound(_) => 2,
            Error::ConfigParse { .. } | Error::UnknownProfile(_) => 4,
            Error::StateFile { .. } | Error::InvalidArgument(_) => 5,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::UnknownProfile("prod".into()).exit_code(), 4);
        assert_eq!(Error::FunctionNotFound("x.y".into()).exit_code(), 2);
        assert_eq!(
            Error::Module(ModuleError::Client(AuthError::MissingSubscription)).exit_code(),
            3
        );
        assert_eq!(
            Error::Module(ModuleError::MissingParameter("name".into())).exit_code(),
            2
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(Error::from(io).exit_code(), 1);
    }

    #[test]
    fn test_display() {
        let err = Error::StateFile {
            path: PathBuf::from("net.yml"),
            message: "top level must be a mapping".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state file 'net.yml': top level must be a mapping"
        );
    }
}
