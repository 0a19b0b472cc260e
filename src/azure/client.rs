//! Resource Manager transport.
//!
//! [`ArmClient`] is the seam every execution function talks through. The
//! production implementation, [`RestClient`], speaks JSON over HTTPS with a
//! bearer token and waits out long-running operations before returning, so
//! callers always see the final resource state.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use url::Url;

use super::auth::{CachedCredential, ConnectionAuth, TokenCredential};
use super::error::{ArmError, AuthError, CloudError};
use super::Service;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default delay between long-running operation polls
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default upper bound on a long-running operation
const DEFAULT_LRO_TIMEOUT_SECS: u64 = 3600;

/// HTTP verbs used against the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Patch,
    Delete,
    Head,
}

impl Method {
    fn as_reqwest(&self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        };
        f.write_str(name)
    }
}

/// One call against the resource manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmRequest {
    pub method: Method,
    /// Resource path below the endpoint, or an absolute `nextLink`
    pub path: String,
    pub api_version: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ArmRequest {
    pub fn new(method: Method, path: impl Into<String>, api_version: &str) -> Self {
        Self {
            method,
            path: path.into(),
            api_version: api_version.to_string(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::Get, path, api_version)
    }

    pub fn put(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::Put, path, api_version)
    }

    pub fn post(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::Post, path, api_version)
    }

    pub fn patch(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::Patch, path, api_version)
    }

    pub fn delete(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::Delete, path, api_version)
    }

    pub fn head(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::Head, path, api_version)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Add a query parameter only when a value is present.
    pub fn query_opt(self, key: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Whether `path` is a full URL, as in a `nextLink`.
    pub fn is_absolute(&self) -> bool {
        self.path.starts_with("http://") || self.path.starts_with("https://")
    }
}

/// Final response after any long-running operation has settled.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmResponse {
    pub status: u16,
    pub body: Value,
}

impl ArmResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can send requests to the resource manager.
#[async_trait]
pub trait ArmClient: Send + Sync {
    /// Subscription all resource paths are rooted in.
    fn subscription_id(&self) -> &str;

    async fn send(&self, request: ArmRequest) -> Result<ArmResponse, ArmError>;
}

/// Settings shared by every [`RestClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Resource manager endpoint
    pub base_url: String,
    /// Timeout of a single HTTP request
    pub timeout: Duration,
    /// Delay between polls when the service gives no `Retry-After`
    pub poll_interval: Duration,
    /// Upper bound on the whole long-running operation
    pub lro_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://management.azure.com".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            lro_timeout: Duration::from_secs(DEFAULT_LRO_TIMEOUT_SECS),
            user_agent: format!("azurearm/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Build the underlying HTTP client.
    pub fn http_client(&self) -> Result<Client, AuthError> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| AuthError::HttpClient(e.to_string()))
    }
}

/// How a long-running operation reports progress.
#[derive(Debug, Clone, Default)]
struct Polling {
    async_operation: Option<String>,
    location: Option<String>,
    retry_after: Option<Duration>,
}

impl Polling {
    fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        Self {
            async_operation: header("azure-asyncoperation"),
            location: header("location"),
            retry_after: header("retry-after")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        }
    }

    fn is_pending(&self) -> bool {
        self.async_operation.is_some() || self.location.is_some()
    }
}

/// reqwest-backed [`ArmClient`].
pub struct RestClient {
    http: Client,
    config: ClientConfig,
    subscription_id: String,
    credential: Arc<dyn TokenCredential>,
}

impl RestClient {
    pub fn new(
        config: ClientConfig,
        subscription_id: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, AuthError> {
        let http = config.http_client()?;
        Ok(Self::with_http(http, config, subscription_id, credential))
    }

    pub fn with_http(
        http: Client,
        config: ClientConfig,
        subscription_id: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
    ) -> Self {
        Self {
            http,
            config,
            subscription_id: subscription_id.into(),
            credential,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url_for(&self, request: &ArmRequest) -> Result<Url, ArmError> {
        if request.is_absolute() {
            return Ok(Url::parse(&request.path)?);
        }

        let mut url = Url::parse(&format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            request.path.trim_start_matches('/')
        ))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", &request.api_version);
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn bearer(&self) -> Result<String, ArmError> {
        Ok(self.credential.get_token().await?.token)
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<(u16, HeaderMap, String), ArmError> {
        let token = self.bearer().await?;
        trace!(%method, %url, "sending request");

        let mut builder = self
            .http
            .request(method.as_reqwest(), url)
            .bearer_auth(token);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await?;
        Ok((status, headers, text))
    }

    async fn get_json(&self, url: &str) -> Result<(u16, Polling, Value), ArmError> {
        let (status, headers, text) = self.dispatch(Method::Get, Url::parse(url)?, None).await?;
        if !(200..300).contains(&status) {
            return Err(CloudError::from_body(status, &text).into());
        }
        Ok((status, Polling::from_headers(&headers), parse_body(&text)))
    }

    /// Wait for a long-running operation, then fetch its final result.
    async fn poll(
        &self,
        request: &ArmRequest,
        original: &Url,
        initial_status: u16,
        initial_body: Value,
        mut polling: Polling,
    ) -> Result<ArmResponse, ArmError> {
        let deadline = Instant::now() + self.config.lro_timeout;
        let mut operation_body = initial_body;
        let mut location_body: Option<Value> = None;

        loop {
            if Instant::now() >= deadline {
                return Err(ArmError::Transport(format!(
                    "Long running operation on {} did not finish within {:?}",
                    original.path(),
                    self.config.lro_timeout
                )));
            }
            let delay = polling.retry_after.unwrap_or(self.config.poll_interval);
            tokio::time::sleep(delay).await;

            if let Some(operation_url) = polling.async_operation.clone() {
                let (_, next, body) = self.get_json(&operation_url).await?;
                let status = body
                    .get("status")
                    .and_then(|s| s.as_str())
                    .unwrap_or("InProgress")
                    .to_string();
                trace!(%status, "polled async operation");
                match status.as_str() {
                    "Succeeded" => {
                        operation_body = body;
                        break;
                    }
                    "Failed" | "Canceled" | "Cancelled" => {
                        return Err(CloudError::from_operation(&body, &status).into());
                    }
                    _ => {
                        polling.retry_after = next.retry_after;
                    }
                }
            } else if let Some(location) = polling.location.clone() {
                let (status, next, body) = self.get_json(&location).await?;
                trace!(status, "polled location");
                if status == 202 {
                    polling.retry_after = next.retry_after;
                    if next.location.is_some() {
                        polling.location = next.location;
                    }
                    continue;
                }
                location_body = Some(body);
                break;
            } else {
                break;
            }
        }

        match request.method {
            Method::Put | Method::Patch => {
                let (_, _, body) = self.get_json(original.as_str()).await?;
                Ok(ArmResponse::new(200, body))
            }
            Method::Post => {
                if let Some(body) = location_body {
                    return Ok(ArmResponse::new(200, body));
                }
                if let Some(location) = &polling.location {
                    let (_, _, body) = self.get_json(location).await?;
                    return Ok(ArmResponse::new(200, body));
                }
                Ok(ArmResponse::new(200, operation_body))
            }
            Method::Delete => Ok(ArmResponse::new(200, Value::Null)),
            Method::Get | Method::Head => Ok(ArmResponse::new(initial_status, operation_body)),
        }
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl ArmClient for RestClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn send(&self, request: ArmRequest) -> Result<ArmResponse, ArmError> {
        let url = self.url_for(&request)?;
        debug!(method = %request.method, path = %url.path(), "resource manager request");

        let (status, headers, text) = self
            .dispatch(request.method, url.clone(), request.body.as_ref())
            .await?;

        if request.method == Method::Head {
            return match status {
                200 | 204 | 404 => Ok(ArmResponse::new(status, Value::Null)),
                _ => Err(CloudError::from_body(status, &text).into()),
            };
        }

        if !(200..300).contains(&status) {
            return Err(CloudError::from_body(status, &text).into());
        }

        let body = parse_body(&text);
        let polling = Polling::from_headers(&headers);
        let long_running = matches!(status, 201 | 202)
            && request.method != Method::Get
            && polling.is_pending();
        if long_running {
            debug!(status, "waiting for long running operation");
            return self.poll(&request, &url, status, body, polling).await;
        }

        Ok(ArmResponse::new(status, body))
    }
}

/// Hands out authenticated clients.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn client(
        &self,
        service: Service,
        auth: &ConnectionAuth,
    ) -> Result<Arc<dyn ArmClient>, AuthError>;
}

/// Builds [`RestClient`]s and reuses one credential per identity.
pub struct DefaultClientFactory {
    config: ClientConfig,
    http: Client,
    credentials: Mutex<HashMap<String, Arc<dyn TokenCredential>>>,
}

impl DefaultClientFactory {
    pub fn new(config: ClientConfig) -> Result<Self, AuthError> {
        let http = config.http_client()?;
        Ok(Self {
            config,
            http,
            credentials: Mutex::new(HashMap::new()),
        })
    }

    fn credential(
        &self,
        auth: &ConnectionAuth,
        cloud: &super::auth::CloudEnvironment,
    ) -> Result<Arc<dyn TokenCredential>, AuthError> {
        let key = auth.identity_key();
        let mut credentials = self.credentials.lock();
        if let Some(existing) = credentials.get(&key) {
            return Ok(existing.clone());
        }
        let inner = auth.credential(self.http.clone(), cloud)?;
        let credential: Arc<dyn TokenCredential> = Arc::new(CachedCredential::new(inner));
        credentials.insert(key, credential.clone());
        Ok(credential)
    }
}

#[async_trait]
impl ClientFactory for DefaultClientFactory {
    async fn client(
        &self,
        service: Service,
        auth: &ConnectionAuth,
    ) -> Result<Arc<dyn ArmClient>, AuthError> {
        let subscription_id = auth.subscription_id()?.to_string();
        let cloud = auth.cloud()?;
        let credential = self.credential(auth, &cloud)?;

        let mut config = self.config.clone();
        config.base_url = auth
            .base_url
            .clone()
            .unwrap_or_else(|| cloud.resource_manager.clone());
        debug!(%service, base_url = %config.base_url, "creating resource manager client");

        Ok(Arc::new(RestClient::with_http(
            self.http.clone(),
            config,
            subscription_id,
            credential,
        )))
    }
}
