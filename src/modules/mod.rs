//! Execution function registry for azurearm
//!
//! Every callable is an async function taking a [`ModuleContext`] and keyword
//! arguments. Execution functions return plain JSON (`{"error": ...}` when the
//! provider rejects a call); state functions return a [`StateReturn`].
//! Both are looked up by `module.function` name in the [`ModuleRegistry`].

pub mod arm;
pub mod authorization;
pub mod compute;
pub mod monitor;
pub mod network;
pub mod resource;

use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::azure::{ArmClient, AuthError, ClientFactory, ConnectionAuth, Service};
use crate::states::StateReturn;

/// Errors that abort a call instead of being reported as data
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Function not found: {0}")]
    NotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error(transparent)]
    Client(#[from] AuthError),
}

/// Result type for module operations
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Keyword arguments passed to a function
pub type ModuleParams = HashMap<String, Value>;

/// Context shared by every call of a run
#[derive(Clone)]
pub struct ModuleContext {
    /// Report what a state would do without doing it
    pub check_mode: bool,
    /// Where ARM clients come from
    pub clients: Arc<dyn ClientFactory>,
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("check_mode", &self.check_mode)
            .finish_non_exhaustive()
    }
}

impl ModuleContext {
    pub fn new(clients: Arc<dyn ClientFactory>) -> Self {
        Self {
            check_mode: false,
            clients,
        }
    }

    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Client for `service`, authenticated with the connection keys in `params`.
    pub async fn client(
        &self,
        service: Service,
        params: &ModuleParams,
    ) -> ModuleResult<Arc<dyn ArmClient>> {
        let auth = ConnectionAuth::from_params(params);
        Ok(self.clients.client(service, &auth).await?)
    }
}

/// Helper trait for extracting parameters
pub trait ParamExt {
    fn get_string(&self, key: &str) -> ModuleResult<Option<String>>;
    fn get_string_required(&self, key: &str) -> ModuleResult<String>;
    fn get_bool(&self, key: &str) -> ModuleResult<Option<bool>>;
    fn get_bool_or(&self, key: &str, default: bool) -> bool;
    fn get_i64(&self, key: &str) -> ModuleResult<Option<i64>>;
    fn get_vec_string(&self, key: &str) -> ModuleResult<Option<Vec<String>>>;
    /// The value, unless it is absent or null
    fn get_value(&self, key: &str) -> Option<&Value>;
}

impl ParamExt for ModuleParams {
    fn get_string(&self, key: &str) -> ModuleResult<Option<String>> {
        match self.get(key) {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Null) | None => Ok(None),
            Some(v) => Ok(Some(v.to_string().trim_matches('"').to_string())),
        }
    }

    fn get_string_required(&self, key: &str) -> ModuleResult<String> {
        self.get_string(key)?
            .ok_or_else(|| ModuleError::MissingParameter(key.to_string()))
    }

    fn get_bool(&self, key: &str) -> ModuleResult<Option<bool>> {
        match self.get(key) {
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Some(true)),
                "false" | "no" | "0" | "off" => Ok(Some(false)),
                _ => Err(ModuleError::InvalidParameter(format!(
                    "{} must be a boolean",
                    key
                ))),
            },
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(ModuleError::InvalidParameter(format!(
                "{} must be a boolean",
                key
            ))),
        }
    }

    fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).ok().flatten().unwrap_or(default)
    }

    fn get_i64(&self, key: &str) -> ModuleResult<Option<i64>> {
        match self.get(key) {
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
                ModuleError::InvalidParameter(format!("{} must be an integer", key))
            }),
            Some(Value::String(s)) => s
                .parse()
                .map(Some)
                .map_err(|_| ModuleError::InvalidParameter(format!("{} must be an integer", key))),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(ModuleError::InvalidParameter(format!(
                "{} must be an integer",
                key
            ))),
        }
    }

    fn get_vec_string(&self, key: &str) -> ModuleResult<Option<Vec<String>>> {
        match self.get(key) {
            Some(Value::Array(arr)) => Ok(Some(
                arr.iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        v => v.to_string().trim_matches('"').to_string(),
                    })
                    .collect(),
            )),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(ModuleError::InvalidParameter(format!(
                "{} must be a list",
                key
            ))),
        }
    }

    fn get_value(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_null())
    }
}

/// Signature of an execution function
pub type ExecFn = for<'a> fn(&'a ModuleContext, &'a ModuleParams) -> BoxFuture<'a, ModuleResult<Value>>;

/// Signature of a state function
pub type StateFn =
    for<'a> fn(&'a ModuleContext, &'a ModuleParams) -> BoxFuture<'a, ModuleResult<StateReturn>>;

/// A registered callable
#[derive(Clone, Copy)]
pub enum Function {
    Execution(ExecFn),
    State(StateFn),
}

impl Function {
    pub fn is_state(&self) -> bool {
        matches!(self, Function::State(_))
    }
}

/// Register execution functions that are in scope under `module`.
macro_rules! register_execution {
    ($registry:expr, $module:expr, [$($func:ident),* $(,)?]) => {{
        use futures::FutureExt;
        $(
            $registry.register(
                $module,
                stringify!($func),
                $crate::modules::Function::Execution(|ctx, params| $func(ctx, params).boxed()),
            );
        )*
    }};
}

/// Register state functions that are in scope under `module`.
macro_rules! register_states {
    ($registry:expr, $module:expr, [$($func:ident),* $(,)?]) => {{
        use futures::FutureExt;
        $(
            $registry.register(
                $module,
                stringify!($func),
                $crate::modules::Function::State(|ctx, params| $func(ctx, params).boxed()),
            );
        )*
    }};
}

pub(crate) use register_execution;
pub(crate) use register_states;

/// Registry for looking up functions by `module.function`
pub struct ModuleRegistry {
    functions: BTreeMap<String, Function>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// Create a registry with every execution and state function
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        network::register(&mut registry);
        resource::register(&mut registry);
        compute::register(&mut registry);
        monitor::register(&mut registry);
        authorization::register(&mut registry);
        crate::states::register(&mut registry);
        registry
    }

    pub fn register(&mut self, module: &str, function: &str, entry: Function) {
        self.functions
            .insert(format!("{}.{}", module, function), entry);
    }

    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// All names with their function, sorted
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Function)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Call any function by name. State returns are serialized to JSON.
    pub async fn call(
        &self,
        name: &str,
        context: &ModuleContext,
        params: &ModuleParams,
    ) -> ModuleResult<Value> {
        match self.get(name) {
            Some(Function::Execution(f)) => f(context, params).await,
            Some(Function::State(f)) => {
                let ret = f(context, params).await?;
                serde_json::to_value(ret).map_err(|e| ModuleError::ExecutionFailed(e.to_string()))
            }
            None => Err(ModuleError::NotFound(name.to_string())),
        }
    }

    /// Call a state function by name.
    pub async fn call_state(
        &self,
        name: &str,
        context: &ModuleContext,
        params: &ModuleParams,
    ) -> ModuleResult<StateReturn> {
        match self.get(name) {
            Some(Function::State(f)) => f(context, params).await,
            Some(Function::Execution(_)) => Err(ModuleError::InvalidParameter(format!(
                "{} is an execution function, not a state",
                name
            ))),
            None => Err(ModuleError::NotFound(name.to_string())),
        }
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::memory::{MemoryClient, MemoryClientFactory};
    use serde_json::json;

    fn context() -> ModuleContext {
        let client = Arc::new(MemoryClient::new("sub"));
        ModuleContext::new(Arc::new(MemoryClientFactory::new(client)))
    }

    #[test]
    fn test_module_registry() {
        let registry = ModuleRegistry::with_builtins();
        assert!(registry.contains("azurearm_network.virtual_network_get"));
        assert!(registry.contains("azurearm_network.virtual_network_present"));
        assert!(registry.contains("azurearm_resource.resource_group_present"));
        assert!(!registry.contains("azurearm_network.nope"));
        assert!(registry
            .get("azurearm_compute.availability_set_absent")
            .map(|f| f.is_state())
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn test_call_unknown_function() {
        let registry = ModuleRegistry::with_builtins();
        let err = registry
            .call("azurearm_network.nope", &context(), &ModuleParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_subscription_is_client_error() {
        let registry = ModuleRegistry::with_builtins();
        let mut params = ModuleParams::new();
        params.insert("name".to_string(), json!("rg1"));
        let err = registry
            .call("azurearm_resource.resource_group_get", &context(), &params)
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::Client(AuthError::MissingSubscription)));
    }

    #[test]
    fn test_param_ext() {
        let mut params: ModuleParams = HashMap::new();
        params.insert("string".to_string(), json!("hello"));
        params.insert("bool_str".to_string(), json!("yes"));
        params.insert("number".to_string(), json!("42"));
        params.insert("array".to_string(), json!(["one", 2]));
        params.insert("null".to_string(), Value::Null);

        assert_eq!(params.get_string("string").unwrap(), Some("hello".to_string()));
        assert_eq!(params.get_string("null").unwrap(), None);
        assert_eq!(params.get_bool("bool_str").unwrap(), Some(true));
        assert_eq!(params.get_i64("number").unwrap(), Some(42));
        assert_eq!(
            params.get_vec_string("array").unwrap(),
            Some(vec!["one".to_string(), "2".to_string()])
        );
        assert!(params.get_vec_string("string").is_err());
        assert!(matches!(
            params.get_string_required("missing"),
            Err(ModuleError::MissingParameter(_))
        ));
    }
}
