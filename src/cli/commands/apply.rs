//! `azurearm apply`: run the states of a state file in order.
//!
//! A state file maps state ids to one or more `module.function` entries,
//! each with a list of single-key argument mappings:
//!
//! ```yaml
//! rg1:
//!   azurearm_resource.resource_group_present:
//!     - location: eastus
//!     - tags:
//!         env: prod
//! ```
//!
//! `name` defaults to the state id. States without `connection_auth` get the
//! selected profile.

use super::{CommandContext, Runnable};
use crate::cli::output::Recap;
use anyhow::Result;
use azurearm::azure::logging::LOG_LEVEL_KEY;
use azurearm::error::Error;
use azurearm::modules::{ModuleParams, ModuleRegistry};
use azurearm::states::{StateReturn, StateStatus};
use clap::Parser;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Arguments for the apply subcommand
#[derive(Parser, Debug, Clone)]
pub struct ApplyArgs {
    /// State file (YAML or JSON)
    pub file: PathBuf,

    /// Stop at the first failed state
    #[arg(long)]
    pub failhard: bool,
}

/// One function call of a state file.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEntry {
    pub id: String,
    pub function: String,
    pub params: ModuleParams,
}

/// Outcome of one entry, as reported in JSON and YAML output.
#[derive(Debug, Serialize)]
struct Applied<'a> {
    id: &'a str,
    function: &'a str,
    status: StateStatus,
    #[serde(flatten)]
    ret: &'a StateReturn,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    states: Vec<Applied<'a>>,
    summary: &'a Recap,
}

/// Parse and validate a state file against the registry.
pub fn parse_state_file(
    path: &Path,
    content: &str,
    registry: &ModuleRegistry,
) -> azurearm::Result<Vec<StateEntry>> {
    let invalid = |message: String| Error::StateFile {
        path: path.to_path_buf(),
        message,
    };

    let document: Option<IndexMap<String, IndexMap<String, Value>>> =
        serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?;

    let mut entries = Vec::new();
    for (id, calls) in document.unwrap_or_default() {
        if calls.is_empty() {
            return Err(invalid(format!("state '{}' names no function", id)));
        }
        for (function, args) in calls {
            match registry.get(&function) {
                Some(f) if f.is_state() => {}
                Some(_) => {
                    return Err(invalid(format!(
                        "'{}' in state '{}' is not a state function",
                        function, id
                    )))
                }
                None => {
                    return Err(invalid(format!(
                        "unknown function '{}' in state '{}'",
                        function, id
                    )))
                }
            }

            let mut params = ModuleParams::new();
            match args {
                Value::Null => {}
                Value::Object(map) => params.extend(map),
                Value::Array(items) => {
                    for item in items {
                        let Value::Object(map) = item else {
                            return Err(invalid(format!(
                                "arguments of '{}' in state '{}' must be mappings",
                                function, id
                            )));
                        };
                        params.extend(map);
                    }
                }
                _ => {
                    return Err(invalid(format!(
                        "arguments of '{}' in state '{}' must be a list",
                        function, id
                    )))
                }
            }
            params
                .entry("name".to_string())
                .or_insert_with(|| Value::String(id.clone()));

            entries.push(StateEntry {
                id: id.clone(),
                function,
                params,
            });
        }
    }
    Ok(entries)
}

impl ApplyArgs {
    /// Execute the apply command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let content = std::fs::read_to_string(&self.file).map_err(|e| Error::StateFile {
            path: self.file.clone(),
            message: e.to_string(),
        })?;
        let entries = parse_state_file(&self.file, &content, &ctx.registry)?;

        let connection = ctx.connection_params()?;
        let log_level = Value::String(ctx.config.defaults.log_level.clone());
        if ctx.check_mode {
            ctx.output.section("CHECK MODE: no changes will be made");
        }
        info!(file = %self.file.display(), states = entries.len(), "applying state file");

        let mut recap = Recap::default();
        let mut results = Vec::with_capacity(entries.len());
        for entry in &entries {
            let mut params = entry.params.clone();
            if !params.contains_key("connection_auth") && !connection.is_empty() {
                let auth = connection.clone().into_iter().collect();
                params.insert("connection_auth".to_string(), Value::Object(auth));
            }
            params
                .entry(LOG_LEVEL_KEY.to_string())
                .or_insert_with(|| log_level.clone());

            let ret = match ctx
                .registry
                .call_state(&entry.function, &ctx.modules, &params)
                .await
            {
                Ok(ret) => ret,
                Err(e) => {
                    warn!(id = %entry.id, function = %entry.function, error = %e, "state aborted");
                    let mut ret = StateReturn::new(
                        params
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or(entry.id.as_str()),
                    );
                    ret.comment = e.to_string();
                    ret
                }
            };

            let status = ret.status();
            recap.record(status);
            ctx.output.state_result(&entry.id, &entry.function, &ret);
            results.push((entry, ret));

            if self.failhard && status == StateStatus::Failed {
                ctx.output.warning("stopping at the first failed state");
                break;
            }
        }

        if ctx.output.is_human() {
            ctx.output.recap(&recap);
        } else {
            let states: Vec<Applied<'_>> = results
                .iter()
                .map(|(entry, ret)| Applied {
                    id: &entry.id,
                    function: &entry.function,
                    status: ret.status(),
                    ret,
                })
                .collect();
            ctx.output.document(&Report {
                states,
                summary: &recap,
            })?;
        }

        Ok(if recap.failed > 0 { 2 } else { 0 })
    }
}

#[async_trait::async_trait]
impl Runnable for ApplyArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(content: &str) -> azurearm::Result<Vec<StateEntry>> {
        parse_state_file(
            Path::new("states.yml"),
            content,
            &ModuleRegistry::with_builtins(),
        )
    }

    #[test]
    fn test_entries_keep_file_order() {
        let entries = parse(
            r#"
rg1:
  azurearm_resource.resource_group_present:
    - location: eastus
vnet1:
  azurearm_network.virtual_network_present:
    - resource_group: rg1
    - address_prefixes: [10.0.0.0/16]
aset:
  azurearm_compute.availability_set_absent:
    - name: aset-real
    - resource_group: rg1
"#,
        )
        .unwrap();

        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["rg1", "vnet1", "aset"]);
        assert_eq!(entries[0].params["name"], json!("rg1"));
        assert_eq!(entries[1].params["address_prefixes"], json!(["10.0.0.0/16"]));
        assert_eq!(entries[2].params["name"], json!("aset-real"));
    }

    #[test]
    fn test_mapping_arguments_are_accepted() {
        let entries = parse(
            "rg1:\n  azurearm_resource.resource_group_absent:\n    connection_auth: {subscription_id: s}\n",
        )
        .unwrap();
        assert_eq!(
            entries[0].params["connection_auth"],
            json!({"subscription_id": "s"})
        );
    }

    #[test]
    fn test_rejects_execution_functions() {
        let err = parse("x:\n  azurearm_network.virtual_network_get:\n    - resource_group: rg\n")
            .unwrap_err();
        assert!(err.to_string().contains("is not a state function"));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_rejects_unknown_and_malformed() {
        let err = parse("x:\n  azurearm_network.nope:\n    - a: b\n").unwrap_err();
        assert!(err.to_string().contains("unknown function 'azurearm_network.nope'"));

        let err = parse("x:\n  azurearm_resource.resource_group_present:\n    - just-a-string\n")
            .unwrap_err();
        assert!(err.to_string().contains("must be mappings"));

        assert!(parse("- not\n- a\n- mapping\n").is_err());
    }

    #[test]
    fn test_empty_file_has_no_entries() {
        assert!(parse("").unwrap().is_empty());
    }
}
