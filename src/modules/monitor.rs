//! `azurearm_monitor` execution functions: diagnostic settings and log
//! profiles.

use serde_json::Value;

use super::arm::{fetch, list_keyed, model_or_return, name, params_with, send_or_error};
use super::{register_execution, ModuleContext, ModuleParams, ModuleRegistry, ModuleResult, ParamExt};
use crate::azure::{api, ids, ArmRequest, Service};

pub const MODULE: &str = "azurearm_monitor";

const MON: Service = Service::Monitor;

const INSIGHTS: &str = "providers/Microsoft.Insights";

fn settings_path(resource_uri: &str, setting: Option<&str>) -> String {
    let base = format!(
        "{}/{}/diagnosticSettings",
        resource_uri.trim_end_matches('/'),
        INSIGHTS
    );
    match setting {
        Some(setting) => format!("{}/{}", base, setting),
        None => base,
    }
}

/// Create or update the diagnostic setting `name` of `resource_uri`.
///
/// `metrics` and `logs` are lists of category settings; at least one sink
/// (workspace, storage account, event hub or service bus rule) is expected by
/// the service.
pub async fn diagnostic_settings_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let setting = name(params)?;
    let resource_uri = params.get_string_required("resource_uri")?;
    let metrics = params.get("metrics").cloned().unwrap_or(Value::Null);
    let logs = params.get("logs").cloned().unwrap_or(Value::Null);
    let client = ctx.client(MON, params).await?;

    let kwargs = params_with(params, &[("metrics", metrics), ("logs", logs)]);
    let body = model_or_return!(MON, "DiagnosticSettingsResource", &kwargs);
    let path = settings_path(&resource_uri, Some(&setting));
    let request = ArmRequest::put(path, api::DIAGNOSTIC_SETTINGS).body(body);
    fetch(client.as_ref(), request, MON, params).await
}

pub async fn diagnostic_settings_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let setting = name(params)?;
    let resource_uri = params.get_string_required("resource_uri")?;
    let client = ctx.client(MON, params).await?;
    let request = ArmRequest::delete(
        settings_path(&resource_uri, Some(&setting)),
        api::DIAGNOSTIC_SETTINGS,
    );
    send_or_error(client.as_ref(), request, MON, params).await
}

pub async fn diagnostic_settings_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let setting = name(params)?;
    let resource_uri = params.get_string_required("resource_uri")?;
    let client = ctx.client(MON, params).await?;
    let request = ArmRequest::get(
        settings_path(&resource_uri, Some(&setting)),
        api::DIAGNOSTIC_SETTINGS,
    );
    fetch(client.as_ref(), request, MON, params).await
}

/// All settings of a resource, as the service returns them: `{"value": [...]}`.
pub async fn diagnostic_settings_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let resource_uri = params.get_string_required("resource_uri")?;
    let client = ctx.client(MON, params).await?;
    let request = ArmRequest::get(settings_path(&resource_uri, None), api::DIAGNOSTIC_SETTINGS);
    fetch(client.as_ref(), request, MON, params).await
}

pub async fn log_profiles_list(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let client = ctx.client(MON, params).await?;
    let path = format!(
        "{}/providers/microsoft.insights/logprofiles",
        ids::subscription(client.subscription_id())
    );
    list_keyed(client.as_ref(), ArmRequest::get(path, api::LOG_PROFILES), "name", MON, params).await
}

pub fn register(registry: &mut ModuleRegistry) {
    register_execution!(
        registry,
        MODULE,
        [
            diagnostic_settings_create_or_update,
            diagnostic_settings_delete,
            diagnostic_settings_get,
            diagnostic_settings_list,
            log_profiles_list,
        ]
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_path() {
        assert_eq!(
            settings_path(
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv/",
                Some("diag")
            ),
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv/providers/Microsoft.Insights/diagnosticSettings/diag"
        );
    }
}
