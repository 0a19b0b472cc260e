//! Shared plumbing for execution functions.
//!
//! Every execution function has the same outline: obtain a client, send one
//! request, normalize the body, and turn a provider rejection into an
//! `{"error": ...}` mapping after logging it.

use serde_json::{json, Map, Value};
use std::fmt::Display;
use tracing::error;

use super::{ModuleContext, ModuleError, ModuleParams, ModuleResult, ParamExt};
use crate::azure::logging::{log_cloud_error, LOG_LEVEL_KEY};
use crate::azure::models::as_dict;
use crate::azure::paging::paged_object_to_list;
use crate::azure::{ArmClient, ArmError, ArmRequest, CloudError, Service};

/// Separate provider rejections from local failures.
pub trait CloudResultExt<T> {
    fn cloud(self) -> ModuleResult<Result<T, CloudError>>;
}

impl<T> CloudResultExt<T> for Result<T, ArmError> {
    fn cloud(self) -> ModuleResult<Result<T, CloudError>> {
        match self {
            Ok(value) => Ok(Ok(value)),
            Err(ArmError::Cloud(e)) => Ok(Err(e)),
            Err(ArmError::Auth(e)) => Err(ModuleError::Client(e)),
            Err(ArmError::Transport(message)) => Err(ModuleError::ExecutionFailed(message)),
        }
    }
}

/// `{"error": message}`
pub fn error_value(message: impl Display) -> Value {
    json!({ "error": message.to_string() })
}

/// Whether an execution result reports an error.
pub fn is_error(value: &Value) -> bool {
    value.get("error").is_some()
}

/// The error text of a result, or an empty string.
pub fn error_text(value: &Value) -> String {
    match value.get("error") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Whether a keyword argument counts as given: not absent, null, false or
/// empty.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
    }
}

/// Copy of `params` with extra keys set.
pub fn params_with(params: &ModuleParams, extra: &[(&str, Value)]) -> ModuleParams {
    let mut out = params.clone();
    for (key, value) in extra {
        out.insert((*key).to_string(), value.clone());
    }
    out
}

/// Copy of `params` with lookups logged at `info`.
pub fn quiet(params: &ModuleParams) -> ModuleParams {
    params_with(params, &[(LOG_LEVEL_KEY, json!("info"))])
}

/// Log a provider error and render it as a result.
pub fn cloud_error(service: Service, exc: &CloudError, params: &ModuleParams) -> Value {
    let message = exc.to_string();
    log_cloud_error(service, &message, params);
    error_value(message)
}

/// Send a request and return the normalized body.
pub async fn fetch(
    client: &dyn ArmClient,
    request: ArmRequest,
    service: Service,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    Ok(match client.send(request).await.cloud()? {
        Ok(response) => as_dict(&response.body),
        Err(exc) => cloud_error(service, &exc, params),
    })
}

/// Send a request and return the normalized `value` array of the body.
pub async fn fetch_values(
    client: &dyn ArmClient,
    request: ArmRequest,
    service: Service,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    Ok(match client.send(request).await.cloud()? {
        Ok(response) => match response.body.get("value") {
            Some(values) => as_dict(values),
            None => Value::Array(Vec::new()),
        },
        Err(exc) => cloud_error(service, &exc, params),
    })
}

/// Send a request, discarding the body. `true` on success, `false` on a
/// provider error.
pub async fn send_bool(
    client: &dyn ArmClient,
    request: ArmRequest,
    service: Service,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    Ok(match client.send(request).await.cloud()? {
        Ok(_) => Value::Bool(true),
        Err(exc) => {
            log_cloud_error(service, &exc.to_string(), params);
            Value::Bool(false)
        }
    })
}

/// Send a request, discarding the body. `true` on success, the error
/// mapping on a provider error.
pub async fn send_or_error(
    client: &dyn ArmClient,
    request: ArmRequest,
    service: Service,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    Ok(match client.send(request).await.cloud()? {
        Ok(_) => Value::Bool(true),
        Err(exc) => cloud_error(service, &exc, params),
    })
}

/// HEAD a resource: `true` for 204 or 200, `false` otherwise.
pub async fn check_existence(
    client: &dyn ArmClient,
    request: ArmRequest,
    service: Service,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    Ok(match client.send(request).await.cloud()? {
        Ok(response) => Value::Bool(response.status == 204 || response.status == 200),
        Err(exc) => {
            log_cloud_error(service, &exc.to_string(), params);
            Value::Bool(false)
        }
    })
}

/// Normalized items of a paged collection.
pub async fn list(
    client: &dyn ArmClient,
    request: ArmRequest,
) -> Result<Vec<Value>, ArmError> {
    Ok(paged_object_to_list(client, request)
        .await?
        .iter()
        .map(as_dict)
        .collect())
}

/// A paged collection as a mapping keyed by `key` of each item.
pub async fn list_keyed(
    client: &dyn ArmClient,
    request: ArmRequest,
    key: &str,
    service: Service,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    Ok(match list(client, request).await.cloud()? {
        Ok(items) => {
            let mut out = Map::new();
            for item in items {
                let id = match item.get(key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => continue,
                };
                out.insert(id, item);
            }
            Value::Object(out)
        }
        Err(exc) => cloud_error(service, &exc, params),
    })
}

/// A paged collection as a plain list.
pub async fn list_plain(
    client: &dyn ArmClient,
    request: ArmRequest,
    service: Service,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    Ok(match list(client, request).await.cloud()? {
        Ok(items) => Value::Array(items),
        Err(exc) => cloud_error(service, &exc, params),
    })
}

/// Fill in `location` from the resource group when the caller left it out.
///
/// `None` means the group could not be read; the caller returns `false`.
pub async fn with_location(
    ctx: &ModuleContext,
    params: &ModuleParams,
    resource_group: &str,
) -> ModuleResult<Option<ModuleParams>> {
    if params.contains_key("location") {
        return Ok(Some(params.clone()));
    }
    let group = super::resource::resource_group_get(
        ctx,
        &params_with(params, &[("name", json!(resource_group))]),
    )
    .await?;
    if is_error(&group) {
        error!("Unable to determine location from resource group specified.");
        return Ok(None);
    }
    Ok(Some(params_with(
        params,
        &[("location", group.get("location").cloned().unwrap_or(Value::Null))],
    )))
}

/// Resource group argument, required by most functions.
pub fn resource_group(params: &ModuleParams) -> ModuleResult<String> {
    params.get_string_required("resource_group")
}

/// Name argument, required by most functions.
pub fn name(params: &ModuleParams) -> ModuleResult<String> {
    params.get_string_required("name")
}

/// Build a request body, or return its error mapping from the caller.
macro_rules! model_or_return {
    ($service:expr, $model:expr, $kwargs:expr) => {
        match $crate::azure::models::build_object_model($service, $model, $kwargs) {
            Ok(body) => body,
            Err(e) => return Ok($crate::modules::arm::error_value(e)),
        }
    };
}

pub(crate) use model_or_return;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::memory::MemoryClient;
    use crate::azure::Method;

    fn params() -> ModuleParams {
        params_with(&ModuleParams::new(), &[("subscription_id", json!("sub"))])
    }

    #[tokio::test]
    async fn test_fetch_returns_error_mapping() {
        let client = MemoryClient::new("sub");
        let value = fetch(
            &client,
            ArmRequest::get("/subscriptions/sub/resourceGroups/missing", "1"),
            Service::Resource,
            &params(),
        )
        .await
        .unwrap();
        assert!(error_text(&value).starts_with("Azure Error: ResourceGroupNotFound"));
    }

    #[tokio::test]
    async fn test_transport_errors_propagate() {
        struct Broken;
        #[async_trait::async_trait]
        impl ArmClient for Broken {
            fn subscription_id(&self) -> &str {
                "sub"
            }
            async fn send(
                &self,
                _request: ArmRequest,
            ) -> Result<crate::azure::ArmResponse, ArmError> {
                Err(ArmError::Transport("connection reset".to_string()))
            }
        }

        let err = fetch(&Broken, ArmRequest::get("/x", "1"), Service::Network, &params())
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::ExecutionFailed(ref m) if m == "connection reset"));
    }

    #[tokio::test]
    async fn test_list_keyed_skips_items_without_key() {
        let client = MemoryClient::new("sub");
        client.respond(
            Method::Get,
            "/list",
            json!({"value": [{"name": "a"}, {"id": "x"}, {"name": "b"}]}),
        );
        let value = list_keyed(
            &client,
            ArmRequest::get("/list", "1"),
            "name",
            Service::Network,
            &params(),
        )
        .await
        .unwrap();
        assert_eq!(value.as_object().unwrap().len(), 2);
        assert_eq!(value["a"]["name"], "a");
    }

    #[tokio::test]
    async fn test_send_bool_logs_and_returns_false() {
        let client = MemoryClient::new("sub");
        client.fail(Method::Delete, "/x", CloudError::new("Conflict", "locked"));
        let value = send_bool(&client, ArmRequest::delete("/x", "1"), Service::Network, &params())
            .await
            .unwrap();
        assert_eq!(value, json!(false));
    }
}
