//! `azurearm functions`: list what the registry holds.

use super::{CommandContext, Runnable};
use anyhow::Result;
use azurearm::modules::ModuleRegistry;
use clap::Parser;

/// Arguments for the functions subcommand
#[derive(Parser, Debug, Clone)]
pub struct FunctionsArgs {
    /// Only state functions
    #[arg(long, conflicts_with = "execution")]
    pub states: bool,

    /// Only execution functions
    #[arg(long)]
    pub execution: bool,

    /// Only names containing this text
    pub filter: Option<String>,
}

impl FunctionsArgs {
    /// Names selected by the flags, sorted.
    pub fn select(&self, registry: &ModuleRegistry) -> Vec<String> {
        registry
            .iter()
            .filter(|(_, function)| {
                (!self.states || function.is_state()) && (!self.execution || !function.is_state())
            })
            .filter(|(name, _)| {
                self.filter
                    .as_deref()
                    .map_or(true, |filter| name.contains(filter))
            })
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Execute the functions command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let names = self.select(&ctx.registry);
        let title = match (self.states, self.execution) {
            (true, _) => "State functions",
            (_, true) => "Execution functions",
            _ => "Functions",
        };
        ctx.output.list(&format!("{} ({})", title, names.len()), &names)?;
        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for FunctionsArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
