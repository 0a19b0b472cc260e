//! `azurearm call`: run one function with keyword arguments.

use super::{parse_kwargs, CommandContext, Runnable};
use anyhow::Result;
use azurearm::azure::logging::LOG_LEVEL_KEY;
use azurearm::error::Error;
use azurearm::modules::arm::is_error;
use azurearm::modules::{Function, ModuleParams};
use azurearm::states::StateStatus;
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

/// Arguments for the call subcommand
#[derive(Parser, Debug, Clone)]
pub struct CallArgs {
    /// Function to call, as `module.function`
    pub function: String,

    /// Keyword arguments as `key=value` (YAML values), or `@file` for a
    /// mapping of them
    pub args: Vec<String>,

    /// YAML or JSON file of keyword arguments, applied before the others
    #[arg(long = "params", value_name = "FILE")]
    pub params_file: Option<PathBuf>,
}

impl CallArgs {
    /// Fill the keyword arguments from the profile. Execution functions get
    /// the connection keys spread in; states get a `connection_auth`
    /// mapping. Explicit arguments always win.
    fn complete(
        &self,
        ctx: &CommandContext,
        function: &Function,
        mut params: ModuleParams,
    ) -> azurearm::Result<ModuleParams> {
        let connection = ctx.connection_params()?;
        if function.is_state() {
            if !params.contains_key("connection_auth") && !connection.is_empty() {
                let auth = connection.into_iter().collect();
                params.insert("connection_auth".to_string(), Value::Object(auth));
            }
        } else {
            for (key, value) in connection {
                params.entry(key).or_insert(value);
            }
        }
        params
            .entry(LOG_LEVEL_KEY.to_string())
            .or_insert_with(|| Value::String(ctx.config.defaults.log_level.clone()));
        Ok(params)
    }

    /// Execute the call command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let function = ctx
            .registry
            .get(&self.function)
            .ok_or_else(|| Error::FunctionNotFound(self.function.clone()))?;
        let mut kwargs = Vec::with_capacity(self.args.len() + 1);
        if let Some(file) = &self.params_file {
            let file = file.display().to_string();
            kwargs.push(format!("@{}", file.strip_prefix('@').unwrap_or(&file)));
        }
        kwargs.extend(self.args.iter().cloned());
        let params = self.complete(ctx, &function, parse_kwargs(&kwargs)?)?;
        ctx.output.debug(&format!(
            "calling {} with {} argument(s)",
            self.function,
            params.len()
        ));
        info!(function = %self.function, state = function.is_state(), "call");

        if function.is_state() {
            let ret = ctx
                .registry
                .call_state(&self.function, &ctx.modules, &params)
                .await
                .map_err(Error::from)?;
            debug!(status = %ret.status(), "state finished");
            ctx.output.document(&ret)?;
            return Ok(if ret.status() == StateStatus::Failed { 2 } else { 0 });
        }

        let value = ctx
            .registry
            .call(&self.function, &ctx.modules, &params)
            .await
            .map_err(Error::from)?;
        ctx.output.value(&value)?;
        Ok(if is_error(&value) { 1 } else { 0 })
    }
}

#[async_trait::async_trait]
impl Runnable for CallArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use azurearm::azure::ConnectionAuth;
    use azurearm::config::Config;
    use serde_json::json;

    fn context(profile: Option<&str>) -> CommandContext {
        let mut config = Config::default();
        config.profiles.insert(
            "prod".to_string(),
            ConnectionAuth {
                subscription_id: Some("sub".to_string()),
                tenant: Some("tenant".to_string()),
                ..ConnectionAuth::default()
            },
        );
        config.defaults.log_level = "warning".to_string();
        let mut argv = vec!["azurearm", "--no-color"];
        if let Some(profile) = profile {
            argv.extend(["-p", profile]);
        }
        argv.push("functions");
        let cli = Cli::try_parse_from(argv).unwrap();
        CommandContext::new(&cli, config).unwrap()
    }

    #[test]
    fn test_parse_call_args() {
        let cli = Cli::try_parse_from([
            "azurearm",
            "call",
            "azurearm_network.virtual_network_get",
            "name=vnet1",
            "resource_group=rg1",
            "--params",
            "@vnet.yml",
        ])
        .unwrap();
        match cli.command {
            Commands::Call(args) => {
                assert_eq!(args.function, "azurearm_network.virtual_network_get");
                assert_eq!(args.args.len(), 2);
                assert_eq!(args.params_file, Some(PathBuf::from("@vnet.yml")));
            }
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn test_execution_gets_profile_keys() {
        let ctx = context(Some("prod"));
        let args = CallArgs {
            function: "azurearm_network.virtual_network_get".to_string(),
            args: vec![],
            params_file: None,
        };
        let function = ctx.registry.get(&args.function).unwrap();
        let mut explicit = ModuleParams::new();
        explicit.insert("tenant".to_string(), json!("mine"));

        let params = args.complete(&ctx, &function, explicit).unwrap();
        assert_eq!(params["subscription_id"], json!("sub"));
        assert_eq!(params["tenant"], json!("mine"));
        assert_eq!(params[LOG_LEVEL_KEY], json!("warning"));
        assert!(!params.contains_key("connection_auth"));
    }

    #[test]
    fn test_state_gets_connection_auth() {
        let ctx = context(Some("prod"));
        let args = CallArgs {
            function: "azurearm_resource.resource_group_present".to_string(),
            args: vec![],
            params_file: None,
        };
        let function = ctx.registry.get(&args.function).unwrap();

        let params = args.complete(&ctx, &function, ModuleParams::new()).unwrap();
        assert_eq!(
            params["connection_auth"],
            json!({"subscription_id": "sub", "tenant": "tenant"})
        );
        assert!(!params.contains_key("subscription_id"));
    }

    #[test]
    fn test_no_profile_adds_nothing() {
        let ctx = context(None);
        let args = CallArgs {
            function: "azurearm_resource.resource_group_present".to_string(),
            args: vec![],
            params_file: None,
        };
        let function = ctx.registry.get(&args.function).unwrap();
        let params = args.complete(&ctx, &function, ModuleParams::new()).unwrap();
        assert!(!params.contains_key("connection_auth"));
    }
}
