//! Structured logging of provider errors.

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use super::Service;

/// Keyword argument that selects the level of [`log_cloud_error`].
pub const LOG_LEVEL_KEY: &str = "azurearm_log_level";

/// Level a cloud error is logged at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudLogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl CloudLogLevel {
    /// Read the level from keyword arguments, defaulting to `error`.
    pub fn from_params(params: &HashMap<String, Value>) -> Self {
        match params.get(LOG_LEVEL_KEY).and_then(|v| v.as_str()) {
            Some(level) => Self::parse(level),
            None => CloudLogLevel::Error,
        }
    }

    pub fn parse(level: &str) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "debug" | "trace" | "garbage" | "profile" | "all" => CloudLogLevel::Debug,
            "info" => CloudLogLevel::Info,
            "warning" | "warn" => CloudLogLevel::Warning,
            _ => CloudLogLevel::Error,
        }
    }
}

/// Render the log line for a provider error.
pub fn cloud_error_message(service: Service, message: &str) -> String {
    format!("An AzureARM {} CloudError has occurred: {}", service, message)
}

/// Log a provider error at the level the caller asked for.
pub fn log_cloud_error(service: Service, message: &str, params: &HashMap<String, Value>) {
    let line = cloud_error_message(service, message);
    match CloudLogLevel::from_params(params) {
        CloudLogLevel::Debug => debug!(service = service.as_str(), "{}", line),
        CloudLogLevel::Info => info!(service = service.as_str(), "{}", line),
        CloudLogLevel::Warning => warn!(service = service.as_str(), "{}", line),
        CloudLogLevel::Error => error!(service = service.as_str(), "{}", line),
    }
}
