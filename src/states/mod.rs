//! State functions.
//!
//! A present state fetches the resource, compares it with the keyword
//! arguments, and calls `create_or_update` only when something differs or
//! the resource is missing. An absent state deletes what it finds. Both
//! report through a [`StateReturn`] and honor test mode, in which nothing is
//! changed and `result` is null whenever a change would have been made.

pub mod diff;

mod compute;
mod network;
mod resource;

pub use diff::{compare_list_of_dicts, compute_diff, deep_diff, Compare, Field, Presence};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::future::Future;

use crate::modules::arm::{is_error, quiet};
use crate::modules::{ModuleContext, ModuleParams, ModuleRegistry, ModuleResult, ParamExt};

/// Comment of a state called without a `connection_auth` mapping.
pub const CONNECTION_AUTH_REQUIRED: &str =
    "Connection information must be specified via connection_auth dictionary!";

/// Outcome of a state function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateReturn {
    pub name: String,
    /// `true` on success, `false` on failure, null when a change is pending
    /// in test mode
    pub result: Option<bool>,
    pub comment: String,
    pub changes: Map<String, Value>,
}

impl StateReturn {
    /// A failed return with no comment yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: Some(false),
            comment: String::new(),
            changes: Map::new(),
        }
    }

    pub fn status(&self) -> StateStatus {
        StateStatus::from(self)
    }
}

/// Summary of a [`StateReturn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateStatus {
    /// Already as desired
    Ok,
    /// Converged by this run
    Changed,
    /// Would change, test mode
    Pending,
    Failed,
}

impl From<&StateReturn> for StateStatus {
    fn from(ret: &StateReturn) -> Self {
        match ret.result {
            Some(true) if ret.changes.is_empty() => StateStatus::Ok,
            Some(true) => StateStatus::Changed,
            None => StateStatus::Pending,
            Some(false) => StateStatus::Failed,
        }
    }
}

impl fmt::Display for StateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StateStatus::Ok => "ok",
            StateStatus::Changed => "changed",
            StateStatus::Pending => "pending",
            StateStatus::Failed => "failed",
        };
        write!(f, "{}", text)
    }
}

/// `Public IP address` -> `public IP address`
fn lower_first(noun: &str) -> String {
    let mut chars = noun.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether a create or delete result reports success.
fn succeeded(outcome: &Value) -> bool {
    match outcome {
        Value::Bool(ok) => *ok,
        Value::Null => false,
        Value::Object(_) => !is_error(outcome),
        _ => true,
    }
}

/// Return the state early when a step produced a final return.
macro_rules! or_return {
    ($step:expr) => {
        match $step {
            Ok(value) => value,
            Err(ret) => return Ok(ret),
        }
    };
}

pub(crate) use or_return;

/// One run of a state function.
pub(crate) struct StateRun<'a> {
    pub ctx: &'a ModuleContext,
    params: &'a ModuleParams,
    auth: ModuleParams,
    noun: &'static str,
    missing: &'static str,
    test: bool,
    pub ret: StateReturn,
}

impl<'a> StateRun<'a> {
    /// Start a run of the state managing `noun`, named by the `name`
    /// argument. Fails as a return when `connection_auth` is not a mapping.
    pub fn start(
        ctx: &'a ModuleContext,
        params: &'a ModuleParams,
        noun: &'static str,
    ) -> ModuleResult<Result<Self, StateReturn>> {
        let name = params.get_string_required("name")?;
        let mut ret = StateReturn::new(name);
        let auth: ModuleParams = match params.get("connection_auth") {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => {
                ret.comment = CONNECTION_AUTH_REQUIRED.to_string();
                return Ok(Err(ret));
            }
        };
        let test = ctx.check_mode || params.get_bool_or("test", false);
        Ok(Ok(Self {
            ctx,
            params,
            auth,
            noun,
            missing: "was not found.",
            test,
            ret,
        }))
    }

    /// Replace the `was not found.` ending of the absent comment.
    pub fn missing_as(mut self, phrase: &'static str) -> Self {
        self.missing = phrase;
        self
    }

    pub fn name(&self) -> &str {
        &self.ret.name
    }

    pub fn params(&self) -> &'a ModuleParams {
        self.params
    }

    pub fn is_test(&self) -> bool {
        self.test
    }

    /// A state argument, or null.
    pub fn arg(&self, key: &str) -> Value {
        self.params.get(key).cloned().unwrap_or(Value::Null)
    }

    /// The connection keys alone.
    pub fn connection(&self) -> ModuleParams {
        self.auth.clone()
    }

    /// Arguments for an execution function: the state's own arguments with
    /// the connection keys spread in, plus `extra`.
    pub fn call_params(&self, extra: &[(&str, Value)]) -> ModuleParams {
        let mut out: ModuleParams = self
            .params
            .iter()
            .filter(|(k, _)| k.as_str() != "connection_auth" && k.as_str() != "test")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.extend(self.auth.iter().map(|(k, v)| (k.clone(), v.clone())));
        for (key, value) in extra {
            out.insert((*key).to_string(), value.clone());
        }
        out
    }

    /// Like [`call_params`](Self::call_params), with provider errors logged
    /// at `info`. Used for lookups whose failure is expected.
    pub fn lookup(&self, extra: &[(&str, Value)]) -> ModuleParams {
        quiet(&self.call_params(extra))
    }

    /// Merge the differences between the state arguments and `found`.
    pub fn diff(&mut self, found: &Value, fields: &[Field]) -> Result<(), StateReturn> {
        let desired = self.params;
        self.diff_with(desired, found, fields)
    }

    /// Like [`diff`](Self::diff) with adjusted desired arguments.
    pub fn diff_with(
        &mut self,
        desired: &ModuleParams,
        found: &Value,
        fields: &[Field],
    ) -> Result<(), StateReturn> {
        match compute_diff(desired, found, fields) {
            Ok(changes) => {
                self.ret.changes.extend(changes);
                Ok(())
            }
            Err(comment) => Err(self.fail(comment)),
        }
    }

    pub fn change(&mut self, key: &str, change: Value) {
        self.ret.changes.insert(key.to_string(), change);
    }

    /// Final return for an existing resource: already present, or pending
    /// in test mode. `None` means the update goes ahead.
    pub fn settle(&mut self) -> Option<StateReturn> {
        if self.ret.changes.is_empty() {
            let comment = format!("{} {} is already present.", self.noun, self.name());
            return Some(self.finish(Some(true), comment));
        }
        if self.test {
            let comment = format!("{} {} would be updated.", self.noun, self.name());
            return Some(self.finish(None, comment));
        }
        None
    }

    /// Record that the resource is missing and will be created as `new`.
    pub fn creating(&mut self, new: Value) {
        self.ret.changes = match json!({ "old": {}, "new": new }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
    }

    /// Final return in test mode, before anything is created.
    pub fn would_create(&mut self) -> Option<StateReturn> {
        if !self.test {
            return None;
        }
        let comment = format!("{} {} would be created.", self.noun, self.name());
        Some(self.finish(None, comment))
    }

    /// Final return after `create_or_update`.
    pub fn created(mut self, outcome: &Value) -> StateReturn {
        if succeeded(outcome) {
            let comment = format!("{} {} has been created.", self.noun, self.name());
            return self.finish(Some(true), comment);
        }
        let error = match outcome.get("error") {
            Some(Value::String(e)) => e.clone(),
            Some(other) => other.to_string(),
            None => "None".to_string(),
        };
        let comment = format!(
            "Failed to create {} {}! ({})",
            lower_first(self.noun),
            self.name(),
            error
        );
        self.finish(Some(false), comment)
    }

    /// Failed return with `comment` and no changes.
    pub fn fail(&mut self, comment: impl Into<String>) -> StateReturn {
        self.ret.changes.clear();
        self.finish(Some(false), comment.into())
    }

    fn finish(&mut self, result: Option<bool>, comment: String) -> StateReturn {
        self.ret.result = result;
        self.ret.comment = comment;
        std::mem::take(&mut self.ret)
    }

    /// Delete `found` unless it is an error mapping, in which case the
    /// resource is already gone.
    pub async fn absent<F, Fut>(mut self, found: Value, delete: F) -> ModuleResult<StateReturn>
    where
        F: FnOnce(ModuleParams) -> Fut,
        Fut: Future<Output = ModuleResult<Value>>,
    {
        if is_error(&found) {
            let comment = format!("{} {} {}", self.noun, self.name(), self.missing);
            return Ok(self.finish(Some(true), comment));
        }
        let removal = json!({ "old": found, "new": {} });
        if self.test {
            self.ret.changes = removal.as_object().cloned().unwrap_or_default();
            let comment = format!("{} {} would be deleted.", self.noun, self.name());
            return Ok(self.finish(None, comment));
        }
        let deleted = delete(self.call_params(&[])).await?;
        if succeeded(&deleted) {
            self.ret.changes = removal.as_object().cloned().unwrap_or_default();
            let comment = format!("{} {} has been deleted.", self.noun, self.name());
            return Ok(self.finish(Some(true), comment));
        }
        let comment = format!("Failed to delete {} {}!", lower_first(self.noun), self.name());
        Ok(self.finish(Some(false), comment))
    }
}

/// Register every state function.
pub fn register(registry: &mut ModuleRegistry) {
    network::register(registry);
    resource::register(registry);
    compute::register(registry);
}
