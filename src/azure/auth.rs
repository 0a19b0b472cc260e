//! Connection parameters and token credentials.
//!
//! A [`ConnectionAuth`] is read from the same keyword arguments every
//! execution function receives. It selects one of three credential flows:
//!
//! 1. service principal (`tenant`, `client_id`, `secret`)
//! 2. username and password against the Azure CLI public client
//! 3. managed identity through the instance metadata service
//!
//! Tokens are cached per credential until shortly before they expire. The
//! cache key carries a fingerprint of the secret, never the secret itself.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use super::error::AuthError;

/// Public client id of the Azure CLI, used for the password grant.
pub const AZURE_CLI_CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

/// Instance metadata token endpoint for managed identity.
pub const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Keys that belong to the connection rather than to the resource.
pub const CONNECTION_KEYS: &[&str] = &[
    "subscription_id",
    "tenant",
    "client_id",
    "secret",
    "username",
    "password",
    "cloud_environment",
    "base_url",
    "access_token",
];

/// Credential bundle passed to every call.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionAuth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Named cloud or a custom resource manager URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_environment: Option<String>,
    /// Override for the resource manager URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Pre-acquired bearer token, skips the token endpoint entirely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl fmt::Debug for ConnectionAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ConnectionAuth")
            .field("subscription_id", &self.subscription_id)
            .field("tenant", &self.tenant)
            .field("client_id", &self.client_id)
            .field("secret", &redact(&self.secret))
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("cloud_environment", &self.cloud_environment)
            .field("base_url", &self.base_url)
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

/// Which token flow a [`ConnectionAuth`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Static,
    ServicePrincipal,
    UserPassword,
    ManagedIdentity,
}

impl ConnectionAuth {
    /// Pick the connection keys out of a keyword argument map.
    ///
    /// Non-string values are rendered to strings, so a numeric subscription
    /// id in YAML still works.
    pub fn from_params(params: &HashMap<String, Value>) -> Self {
        let get = |key: &str| -> Option<String> {
            match params.get(key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Null) | None => None,
                Some(Value::String(_)) => None,
                Some(other) => Some(other.to_string()),
            }
        };

        Self {
            subscription_id: get("subscription_id"),
            tenant: get("tenant"),
            client_id: get("client_id"),
            secret: get("secret"),
            username: get("username"),
            password: get("password"),
            cloud_environment: get("cloud_environment"),
            base_url: get("base_url"),
            access_token: get("access_token"),
        }
    }

    /// Render back into keyword arguments, for merging a profile into a call.
    pub fn to_params(&self) -> HashMap<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => HashMap::new(),
        }
    }

    pub fn subscription_id(&self) -> Result<&str, AuthError> {
        self.subscription_id
            .as_deref()
            .ok_or(AuthError::MissingSubscription)
    }

    pub fn cloud(&self) -> Result<CloudEnvironment, AuthError> {
        match self.cloud_environment.as_deref() {
            Some(name) => CloudEnvironment::from_name(name),
            None => Ok(CloudEnvironment::public()),
        }
    }

    pub fn credential_kind(&self) -> CredentialKind {
        if self.access_token.is_some() {
            CredentialKind::Static
        } else if self.tenant.is_some() && self.client_id.is_some() && self.secret.is_some() {
            CredentialKind::ServicePrincipal
        } else if self.username.is_some() && self.password.is_some() {
            CredentialKind::UserPassword
        } else {
            CredentialKind::ManagedIdentity
        }
    }

    /// Cache key for the credential this bundle resolves to.
    ///
    /// Tokens, secrets and passwords enter the key only as a fingerprint,
    /// so a bundle with a different secret never reuses another's token.
    pub fn identity_key(&self) -> String {
        let cloud = self.cloud_environment.as_deref().unwrap_or("AZURE_PUBLIC_CLOUD");
        match self.credential_kind() {
            CredentialKind::Static => {
                format!("static|{}|{}", cloud, fingerprint(self.access_token.as_deref()))
            }
            CredentialKind::ServicePrincipal => format!(
                "sp|{}|{}|{}|{}",
                cloud,
                self.tenant.as_deref().unwrap_or_default(),
                self.client_id.as_deref().unwrap_or_default(),
                fingerprint(self.secret.as_deref())
            ),
            CredentialKind::UserPassword => format!(
                "user|{}|{}|{}|{}",
                cloud,
                self.tenant.as_deref().unwrap_or("common"),
                self.username.as_deref().unwrap_or_default(),
                fingerprint(self.password.as_deref())
            ),
            CredentialKind::ManagedIdentity => format!(
                "msi|{}|{}",
                cloud,
                self.client_id.as_deref().unwrap_or("system")
            ),
        }
    }

    /// Build the credential for this bundle.
    pub fn credential(
        &self,
        http: Client,
        cloud: &CloudEnvironment,
    ) -> Result<Box<dyn TokenCredential>, AuthError> {
        let credential: Box<dyn TokenCredential> = match self.credential_kind() {
            CredentialKind::Static => Box::new(StaticTokenCredential::new(
                self.access_token.clone().unwrap_or_default(),
            )),
            CredentialKind::ServicePrincipal => Box::new(ClientSecretCredential {
                http,
                authority_host: cloud.authority_host.clone(),
                tenant: self.tenant.clone().unwrap_or_default(),
                client_id: self.client_id.clone().unwrap_or_default(),
                secret: self.secret.clone().unwrap_or_default(),
                resource: cloud.audience.clone(),
            }),
            CredentialKind::UserPassword => Box::new(UsernamePasswordCredential {
                http,
                authority_host: cloud.authority_host.clone(),
                tenant: self.tenant.clone().unwrap_or_else(|| "common".to_string()),
                username: self.username.clone().unwrap_or_default(),
                password: self.password.clone().unwrap_or_default(),
                resource: cloud.audience.clone(),
            }),
            CredentialKind::ManagedIdentity => Box::new(ManagedIdentityCredential {
                http,
                endpoint: IMDS_TOKEN_ENDPOINT.to_string(),
                resource: cloud.audience.clone(),
                client_id: self.client_id.clone(),
            }),
        };
        Ok(credential)
    }
}

/// Endpoints of one Azure cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudEnvironment {
    pub name: String,
    /// Resource manager base URL
    pub resource_manager: String,
    /// Token authority host
    pub authority_host: String,
    /// Resource (audience) tokens are requested for
    pub audience: String,
}

impl CloudEnvironment {
    fn named(name: &str, resource_manager: &str, authority_host: &str, audience: &str) -> Self {
        Self {
            name: name.to_string(),
            resource_manager: resource_manager.to_string(),
            authority_host: authority_host.to_string(),
            audience: audience.to_string(),
        }
    }

    pub fn public() -> Self {
        Self::named(
            "AZURE_PUBLIC_CLOUD",
            "https://management.azure.com",
            "https://login.microsoftonline.com",
            "https://management.core.windows.net/",
        )
    }

    /// Resolve a cloud name or a custom resource manager URL.
    pub fn from_name(name: &str) -> Result<Self, AuthError> {
        if name.starts_with("http") {
            let mut custom = Self::public();
            custom.name = "CUSTOM".to_string();
            custom.resource_manager = name.trim_end_matches('/').to_string();
            return Ok(custom);
        }

        match name.to_ascii_uppercase().as_str() {
            "AZURE_PUBLIC_CLOUD" => Ok(Self::public()),
            "AZURE_CHINA_CLOUD" => Ok(Self::named(
                "AZURE_CHINA_CLOUD",
                "https://management.chinacloudapi.cn",
                "https://login.chinacloudapi.cn",
                "https://management.core.chinacloudapi.cn/",
            )),
            "AZURE_US_GOV_CLOUD" => Ok(Self::named(
                "AZURE_US_GOV_CLOUD",
                "https://management.usgovcloudapi.net",
                "https://login.microsoftonline.us",
                "https://management.core.usgovcloudapi.net/",
            )),
            "AZURE_GERMAN_CLOUD" => Ok(Self::named(
                "AZURE_GERMAN_CLOUD",
                "https://management.microsoftazure.de",
                "https://login.microsoftonline.de",
                "https://management.core.cloudapi.de/",
            )),
            _ => Err(AuthError::UnknownCloud(name.to_string())),
        }
    }
}

impl Default for CloudEnvironment {
    fn default() -> Self {
        Self::public()
    }
}

/// A bearer token and when it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_fresh(&self) -> bool {
        Utc::now() + ChronoDuration::seconds(EXPIRY_MARGIN_SECS) < self.expires_on
    }
}

/// Source of bearer tokens for the resource manager.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self) -> Result<AccessToken, AuthError>;
}

/// A fixed token, never refreshed.
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_on: Utc::now() + ChronoDuration::days(365),
        })
    }
}

/// Service principal with a client secret.
pub struct ClientSecretCredential {
    pub http: Client,
    pub authority_host: String,
    pub tenant: String,
    pub client_id: String,
    pub secret: String,
    pub resource: String,
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        let url = token_url(&self.authority_host, &self.tenant);
        debug!(client_id = %self.client_id, "requesting service principal token");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.secret.as_str()),
            ("resource", self.resource.as_str()),
        ];
        let response = self.http.post(&url).form(&form).send().await;
        parse_token_response(&url, response).await
    }
}

/// Resource owner password grant against the Azure CLI client.
pub struct UsernamePasswordCredential {
    pub http: Client,
    pub authority_host: String,
    pub tenant: String,
    pub username: String,
    pub password: String,
    pub resource: String,
}

#[async_trait]
impl TokenCredential for UsernamePasswordCredential {
    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        let url = token_url(&self.authority_host, &self.tenant);
        debug!(username = %self.username, "requesting user token");
        let form = [
            ("grant_type", "password"),
            ("client_id", AZURE_CLI_CLIENT_ID),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("resource", self.resource.as_str()),
        ];
        let response = self.http.post(&url).form(&form).send().await;
        parse_token_response(&url, response).await
    }
}

/// Managed identity through the instance metadata service.
pub struct ManagedIdentityCredential {
    pub http: Client,
    pub endpoint: String,
    pub resource: String,
    /// User-assigned identity, if any
    pub client_id: Option<String>,
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        debug!(endpoint = %self.endpoint, "requesting managed identity token");
        let mut query = vec![
            ("api-version", "2018-02-01"),
            ("resource", self.resource.as_str()),
        ];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }
        let response = self
            .http
            .get(&self.endpoint)
            .header("Metadata", "true")
            .query(&query)
            .send()
            .await;
        parse_token_response(&self.endpoint, response).await
    }
}

/// Wraps a credential and hands out its token until it is about to expire.
pub struct CachedCredential {
    inner: Box<dyn TokenCredential>,
    cached: Mutex<Option<AccessToken>>,
}

impl CachedCredential {
    pub fn new(inner: Box<dyn TokenCredential>) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenCredential for CachedCredential {
    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        let cached = self.cached.lock().clone();
        if let Some(token) = cached.filter(|t| t.is_fresh()) {
            return Ok(token);
        }

        let token = self.inner.get_token().await?;
        *self.cached.lock() = Some(token.clone());
        Ok(token)
    }
}

/// Short SHA-256 digest of a secret, for use in cache keys.
fn fingerprint(secret: Option<&str>) -> String {
    let digest = Sha256::digest(secret.unwrap_or_default().as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

fn token_url(authority_host: &str, tenant: &str) -> String {
    format!("{}/{}/oauth2/token", authority_host.trim_end_matches('/'), tenant)
}

/// The v1 token endpoints return numbers as strings, IMDS returns either.
fn seconds_field(body: &Value, key: &str) -> Option<i64> {
    match body.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

async fn parse_token_response(
    authority: &str,
    response: Result<reqwest::Response, reqwest::Error>,
) -> Result<AccessToken, AuthError> {
    let token_error = |message: String| AuthError::TokenRequest {
        authority: authority.to_string(),
        message,
    };

    let response = response.map_err(|e| token_error(e.to_string()))?;
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| token_error(format!("invalid token response ({})", e)))?;

    if !status.is_success() {
        let message = body
            .get("error_description")
            .or_else(|| body.get("error"))
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        return Err(token_error(message));
    }

    let token = body
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| token_error("response did not contain an access_token".to_string()))?;

    let expires_on = match seconds_field(&body, "expires_on")
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
    {
        Some(at) => at,
        None => {
            Utc::now() + ChronoDuration::seconds(seconds_field(&body, "expires_in").unwrap_or(3600))
        }
    };

    Ok(AccessToken {
        token: token.to_string(),
        expires_on,
    })
}
