//! Subcommands of the azurearm CLI

pub mod apply;
pub mod call;
pub mod functions;

use crate::cli::output::OutputFormatter;
use crate::cli::Cli;
use anyhow::Result;
use azurearm::azure::DefaultClientFactory;
use azurearm::config::Config;
use azurearm::error::Error;
use azurearm::modules::{ModuleContext, ModuleParams, ModuleRegistry};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Common context shared between commands
pub struct CommandContext {
    pub config: Config,
    pub output: OutputFormatter,
    /// Profile named on the command line
    pub profile: Option<String>,
    pub verbosity: u8,
    /// Test mode for state functions
    pub check_mode: bool,
    pub registry: ModuleRegistry,
    /// Context handed to every function
    pub modules: ModuleContext,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &Cli, config: Config) -> Result<Self> {
        let output = OutputFormatter::new(!cli.no_color, cli.output, cli.verbosity());
        let factory = DefaultClientFactory::new(config.client_config()).map_err(Error::from)?;
        let modules = ModuleContext::new(Arc::new(factory)).with_check_mode(cli.check_mode);

        Ok(Self {
            config,
            output,
            profile: cli.profile.clone(),
            verbosity: cli.verbosity(),
            check_mode: cli.check_mode,
            registry: ModuleRegistry::with_builtins(),
            modules,
        })
    }

    /// Connection keys of the selected profile, without unset keys. Empty
    /// when no profile applies.
    pub fn connection_params(&self) -> azurearm::Result<ModuleParams> {
        let auth = self.config.connection_auth(self.profile.as_deref())?;
        Ok(auth
            .map(|auth| {
                auth.to_params()
                    .into_iter()
                    .filter(|(_, value)| !value.is_null())
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Parse `key=value` arguments and `@file` mappings into keyword arguments.
///
/// Values are read as YAML, so `count=3` is a number and `tags={a: b}` a
/// mapping; anything that is not valid YAML stays a string. Later arguments
/// win.
pub fn parse_kwargs(args: &[String]) -> azurearm::Result<ModuleParams> {
    let mut params = ModuleParams::new();

    for arg in args {
        if let Some(file_path) = arg.strip_prefix('@') {
            params.extend(read_mapping(Path::new(file_path))?);
        } else if let Some((key, value)) = arg.split_once('=') {
            if key.is_empty() {
                return Err(Error::InvalidArgument(arg.clone()));
            }
            let parsed = if value.is_empty() {
                Value::String(String::new())
            } else {
                serde_yaml::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
            };
            params.insert(key.to_string(), parsed);
        } else {
            return Err(Error::InvalidArgument(arg.clone()));
        }
    }

    Ok(params)
}

/// A YAML or JSON file holding one mapping of keyword arguments.
fn read_mapping(path: &Path) -> azurearm::Result<ModuleParams> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&content)?;
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Null => Ok(ModuleParams::new()),
        _ => Err(Error::InvalidArgument(format!(
            "@{}: file must hold a mapping",
            path.display()
        ))),
    }
}

/// Trait for runnable commands
#[async_trait::async_trait]
pub trait Runnable {
    /// Execute the command, returning the process exit code
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_kwargs_values_are_yaml() {
        let params = parse_kwargs(&args(&[
            "name=vnet1",
            "count=3",
            "enabled=true",
            "tags={env: prod}",
            "prefixes=[10.0.0.0/16]",
            "empty=",
        ]))
        .unwrap();
        assert_eq!(params["name"], json!("vnet1"));
        assert_eq!(params["count"], json!(3));
        assert_eq!(params["enabled"], json!(true));
        assert_eq!(params["tags"], json!({"env": "prod"}));
        assert_eq!(params["prefixes"], json!(["10.0.0.0/16"]));
        assert_eq!(params["empty"], json!(""));
    }

    #[test]
    fn test_parse_kwargs_rejects_bare_words() {
        assert!(matches!(
            parse_kwargs(&args(&["vnet1"])),
            Err(Error::InvalidArgument(arg)) if arg == "vnet1"
        ));
        assert!(parse_kwargs(&args(&["=x"])).is_err());
    }

    #[test]
    fn test_parse_kwargs_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "name: from-file\nlocation: eastus").unwrap();
        let at = format!("@{}", file.path().display());

        let params = parse_kwargs(&args(&[&at, "name=override"])).unwrap();
        assert_eq!(params["name"], json!("override"));
        assert_eq!(params["location"], json!("eastus"));
    }
}
