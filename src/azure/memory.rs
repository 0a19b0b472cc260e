//! In-memory resource manager.
//!
//! [`MemoryClient`] behaves like a small ARM control plane: PUT stores,
//! GET reads or lists, DELETE removes. Every request is recorded, and
//! failures or canned responses can be injected per method and path. The
//! test suites run every execution and state function against it.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::auth::ConnectionAuth;
use super::client::{ArmClient, ArmRequest, ArmResponse, ClientFactory, Method};
use super::error::{ArmError, AuthError, CloudError};
use super::Service;

fn normalize(path: &str) -> String {
    path.trim_end_matches('/').to_ascii_lowercase()
}

fn segments(path: &str) -> Vec<&str> {
    let path = path.split('?').next().unwrap_or(path);
    let path = match path.find("://") {
        Some(scheme) => match path[scheme + 3..].find('/') {
            Some(host_end) => &path[scheme + 3 + host_end..],
            None => "",
        },
        None => path,
    };
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Segments after the last `providers/{namespace}` pair, if any.
fn provider_tail<'a>(parts: &'a [&'a str]) -> Option<&'a [&'a str]> {
    (0..parts.len().saturating_sub(1))
        .rev()
        .find(|&i| parts[i].eq_ignore_ascii_case("providers") && parts[i + 1].contains('.'))
        .map(|i| &parts[i + 2..])
}

/// Whether a path names a collection rather than a single resource.
fn is_collection(path: &str) -> bool {
    let parts = segments(path);
    match provider_tail(&parts) {
        Some(tail) => tail.len() % 2 == 1,
        None => parts.len() % 2 == 1,
    }
}

fn not_found(path: &str) -> CloudError {
    let parts = segments(path);
    let name = parts.last().copied().unwrap_or_default();
    match provider_tail(&parts) {
        Some(tail) if tail.len() > 2 => {
            CloudError::new("NotFound", format!("Resource {} not found.", path)).with_status(404)
        }
        Some(tail) => CloudError::new(
            "ResourceNotFound",
            format!(
                "The Resource '{}/{}' was not found.",
                tail.first().copied().unwrap_or_default(),
                name
            ),
        )
        .with_status(404),
        None if parts.len() == 4 && parts[2].eq_ignore_ascii_case("resourcegroups") => {
            CloudError::new(
                "ResourceGroupNotFound",
                format!("Resource group '{}' could not be found.", name),
            )
            .with_status(404)
        }
        None => CloudError::new("NotFound", format!("The entity '{}' was not found.", name))
            .with_status(404),
    }
}

struct Injected {
    method: Method,
    path: String,
    error: CloudError,
    remaining: Option<usize>,
}

#[derive(Default)]
struct MemoryState {
    resources: BTreeMap<String, Value>,
    requests: Vec<ArmRequest>,
    failures: Vec<Injected>,
    responses: HashMap<(Method, String), Value>,
}

/// In-memory [`ArmClient`].
pub struct MemoryClient {
    subscription_id: String,
    state: Mutex<MemoryState>,
}

impl MemoryClient {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Add `id`, `name` and a succeeded provisioning state to a body.
    fn decorate(path: &str, body: Value) -> Value {
        let mut object = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let trimmed = path.trim_end_matches('/');
        let name = trimmed.rsplit('/').next().unwrap_or_default();
        object.insert("id".to_string(), Value::String(trimmed.to_string()));
        object.insert("name".to_string(), Value::String(name.to_string()));
        let properties = object
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(props) = properties {
            props.insert("provisioningState".to_string(), json!("Succeeded"));
        }
        Value::Object(object)
    }

    /// Store a resource as if it had been PUT.
    pub fn seed(&self, path: &str, body: Value) -> Value {
        let stored = Self::decorate(path, body);
        self.state
            .lock()
            .resources
            .insert(normalize(path), stored.clone());
        stored
    }

    /// Current stored body of a resource.
    pub fn resource(&self, path: &str) -> Option<Value> {
        self.state.lock().resources.get(&normalize(path)).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state.lock().resources.contains_key(&normalize(path))
    }

    /// Fail every matching request with `error`.
    pub fn fail(&self, method: Method, path: &str, error: CloudError) {
        self.state.lock().failures.push(Injected {
            method,
            path: normalize(path),
            error,
            remaining: None,
        });
    }

    /// Fail only the next matching request with `error`.
    pub fn fail_once(&self, method: Method, path: &str, error: CloudError) {
        self.state.lock().failures.push(Injected {
            method,
            path: normalize(path),
            error,
            remaining: Some(1),
        });
    }

    /// Answer every matching request with a fixed body.
    pub fn respond(&self, method: Method, path: &str, body: Value) {
        self.state
            .lock()
            .responses
            .insert((method, normalize(path)), body);
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ArmRequest> {
        self.state.lock().requests.clone()
    }

    /// Requests with the given method whose path ends with `suffix`
    /// (case-insensitive).
    pub fn requests_matching(&self, method: Method, suffix: &str) -> Vec<ArmRequest> {
        let suffix = normalize(suffix);
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method && normalize(&r.path).ends_with(&suffix))
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    fn injected_failure(state: &mut MemoryState, method: Method, key: &str) -> Option<CloudError> {
        let position = state
            .failures
            .iter()
            .position(|f| f.method == method && f.path == key)?;
        let failure = &mut state.failures[position];
        let error = failure.error.clone();
        if let Some(remaining) = failure.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                state.failures.remove(position);
            }
        }
        Some(error)
    }

    fn children(state: &MemoryState, key: &str) -> Vec<Value> {
        let prefix = format!("{}/", key);
        state
            .resources
            .iter()
            .filter(|(k, _)| {
                k.strip_prefix(&prefix)
                    .map(|rest| !rest.contains('/'))
                    .unwrap_or(false)
            })
            .map(|(_, v)| v.clone())
            .collect()
    }
}

#[async_trait]
impl ArmClient for MemoryClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn send(&self, request: ArmRequest) -> Result<ArmResponse, ArmError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        let key = normalize(&request.path);

        if let Some(error) = Self::injected_failure(&mut state, request.method, &key) {
            return Err(error.into());
        }
        if let Some(body) = state.responses.get(&(request.method, key.clone())) {
            return Ok(ArmResponse::new(200, body.clone()));
        }

        match request.method {
            Method::Get => {
                if let Some(body) = state.resources.get(&key) {
                    return Ok(ArmResponse::new(200, body.clone()));
                }
                if is_collection(&request.path) {
                    let value = Self::children(&state, &key);
                    return Ok(ArmResponse::new(200, json!({ "value": value })));
                }
                Err(not_found(&request.path).into())
            }
            Method::Head => {
                let status = if state.resources.contains_key(&key) {
                    204
                } else {
                    404
                };
                Ok(ArmResponse::new(status, Value::Null))
            }
            Method::Put => {
                let existed = state.resources.contains_key(&key);
                let stored =
                    Self::decorate(&request.path, request.body.clone().unwrap_or(Value::Null));
                state.resources.insert(key, stored.clone());
                Ok(ArmResponse::new(if existed { 200 } else { 201 }, stored))
            }
            Method::Patch => {
                let existing = state
                    .resources
                    .get_mut(&key)
                    .ok_or_else(|| ArmError::Cloud(not_found(&request.path)))?;
                if let (Value::Object(target), Some(Value::Object(patch))) =
                    (existing, request.body.clone())
                {
                    for (k, v) in patch {
                        target.insert(k, v);
                    }
                }
                Ok(ArmResponse::new(200, state.resources[&key].clone()))
            }
            Method::Delete => {
                let prefix = format!("{}/", key);
                let existed = state.resources.remove(&key).is_some();
                state.resources.retain(|k, _| !k.starts_with(&prefix));
                Ok(ArmResponse::new(if existed { 200 } else { 204 }, Value::Null))
            }
            Method::Post => Ok(ArmResponse::new(200, json!({}))),
        }
    }
}

/// [`ClientFactory`] that always hands out the same [`MemoryClient`].
pub struct MemoryClientFactory {
    client: Arc<MemoryClient>,
    services: Mutex<Vec<Service>>,
}

impl MemoryClientFactory {
    pub fn new(client: Arc<MemoryClient>) -> Self {
        Self {
            client,
            services: Mutex::new(Vec::new()),
        }
    }

    /// Services clients were requested for, in order.
    pub fn services(&self) -> Vec<Service> {
        self.services.lock().clone()
    }
}

#[async_trait]
impl ClientFactory for MemoryClientFactory {
    async fn client(
        &self,
        service: Service,
        auth: &ConnectionAuth,
    ) -> Result<Arc<dyn ArmClient>, AuthError> {
        auth.subscription_id()?;
        self.services.lock().push(service);
        Ok(self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VNET: &str =
        "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1";

    #[test]
    fn test_collection_detection() {
        assert!(is_collection("/subscriptions/sub/resourcegroups"));
        assert!(!is_collection("/subscriptions/sub/resourcegroups/rg"));
        assert!(!is_collection(VNET));
        assert!(is_collection(&format!("{}/subnets", VNET)));
        assert!(is_collection("/subscriptions/sub/providers"));
        assert!(is_collection(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Authorization/locks"
        ));
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let client = MemoryClient::new("sub");
        let put = client
            .send(ArmRequest::put(VNET, "1").body(json!({"location": "eastus"})))
            .await
            .unwrap();
        assert_eq!(put.status, 201);
        assert_eq!(put.body["name"], "vnet1");
        assert_eq!(put.body["properties"]["provisioningState"], "Succeeded");

        let got = client.send(ArmRequest::get(VNET, "1")).await.unwrap();
        assert_eq!(got.body["location"], "eastus");

        client.send(ArmRequest::delete(VNET, "1")).await.unwrap();
        let err = client.send(ArmRequest::get(VNET, "1")).await.unwrap_err();
        match err {
            ArmError::Cloud(e) => assert_eq!(e.code, "ResourceNotFound"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_child_not_found_code() {
        let client = MemoryClient::new("sub");
        let err = client
            .send(ArmRequest::get(format!("{}/subnets/sn1", VNET), "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ArmError::Cloud(e) if e.code == "NotFound"));
    }

    #[tokio::test]
    async fn test_collection_lists_direct_children() {
        let client = MemoryClient::new("sub");
        client.seed(VNET, json!({}));
        client.seed(&format!("{}/subnets/a", VNET), json!({}));
        client.seed(&format!("{}/subnets/b", VNET), json!({}));

        let list = client
            .send(ArmRequest::get(format!("{}/subnets", VNET), "1"))
            .await
            .unwrap();
        assert_eq!(list.body["value"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fail_once() {
        let client = MemoryClient::new("sub");
        client.fail_once(Method::Put, VNET, CloudError::new("Conflict", "busy"));
        assert!(client.send(ArmRequest::put(VNET, "1")).await.is_err());
        assert!(client.send(ArmRequest::put(VNET, "1")).await.is_ok());
        assert_eq!(client.requests().len(), 2);
        client.clear_requests();
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_factory_records_services() {
        let factory = MemoryClientFactory::new(Arc::new(MemoryClient::new("sub")));
        let auth = ConnectionAuth {
            subscription_id: Some("sub".to_string()),
            ..ConnectionAuth::default()
        };
        factory.client(Service::Network, &auth).await.unwrap();
        factory.client(Service::Compute, &auth).await.unwrap();
        assert_eq!(factory.services(), vec![Service::Network, Service::Compute]);

        let missing = factory.client(Service::Network, &ConnectionAuth::default()).await;
        assert!(matches!(missing, Err(AuthError::MissingSubscription)));
    }
}
