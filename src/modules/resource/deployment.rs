//! Template deployments in a resource group.

use serde_json::{json, Value};

use super::LOG;
use crate::azure::models::as_dict;
use crate::azure::{api, ids, ArmClient, ArmRequest, Service};
use crate::modules::arm::{
    check_existence, cloud_error, fetch, is_error, list_keyed, model_or_return, name,
    resource_group, send_bool, CloudResultExt,
};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};

const RES: Service = Service::Resource;

const DEFAULT_MODE: &str = "incremental";
const DEFAULT_DEBUG: &str = "none";

fn deployment_path(client: &dyn ArmClient, rg: &str, deployment: &str) -> String {
    ids::provider(
        client.subscription_id(),
        rg,
        "Microsoft.Resources",
        &format!("deployments/{}", deployment),
    )
}

/// Keyword arguments of the `DeploymentProperties` model.
///
/// An inline template or parameter set wins over a link. A link may be given
/// as a URI or as a full mapping. Without any template the link is left with
/// an empty URI, which fails model construction.
fn deployment_properties(params: &ModuleParams) -> ModuleResult<ModuleParams> {
    let mut props = params.clone();
    let mode = params
        .get_string("deploy_mode")?
        .unwrap_or_else(|| DEFAULT_MODE.to_string());
    let debug = params
        .get_string("debug_setting")?
        .unwrap_or_else(|| DEFAULT_DEBUG.to_string());
    props.insert("mode".to_string(), json!(mode));
    props.insert("debug_setting".to_string(), json!({ "detail_level": debug }));

    props.remove("parameters");
    props.remove("parameters_link");
    if let Some(values) = params.get_value("deploy_params") {
        props.insert("parameters".to_string(), values.clone());
    } else if let Some(link) = params.get_value("parameters_link") {
        let link = match link {
            Value::Object(_) => link.clone(),
            uri => json!({ "uri": uri }),
        };
        props.insert("parameters_link".to_string(), link);
    }

    props.remove("template");
    props.remove("template_link");
    if let Some(template) = params.get_value("deploy_template") {
        props.insert("template".to_string(), template.clone());
    } else {
        let link = match params.get_value("template_link") {
            Some(link @ Value::Object(_)) => link.clone(),
            Some(uri) => json!({ "uri": uri }),
            None => json!({ "uri": null }),
        };
        props.insert("template_link".to_string(), link);
    }
    Ok(props)
}

pub async fn deployment_operation_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let operation = params.get_string_required("operation")?;
    let deployment = params.get_string_required("deployment")?;
    let rg = resource_group(params)?;
    let client = ctx.client(RES, params).await?;
    let path = format!(
        "{}/operations/{}",
        deployment_path(client.as_ref(), &rg, &deployment),
        operation
    );
    fetch(client.as_ref(), ArmRequest::get(path, api::RESOURCES), LOG, params).await
}

/// Operations of a deployment keyed by operation id, at most `result_limit`
/// (10 by default).
pub async fn deployment_operations_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let deployment = name(params)?;
    let rg = resource_group(params)?;
    let limit = params.get_i64("result_limit")?.unwrap_or(10);
    let client = ctx.client(RES, params).await?;
    let path = format!("{}/operations", deployment_path(client.as_ref(), &rg, &deployment));
    let request = ArmRequest::get(path, api::RESOURCES).query("$top", limit.to_string());
    list_keyed(client.as_ref(), request, "operation_id", LOG, params).await
}

pub async fn deployment_delete(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let deployment = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(RES, params).await?;
    let path = deployment_path(client.as_ref(), &rg, &deployment);
    send_bool(client.as_ref(), ArmRequest::delete(path, api::RESOURCES), LOG, params).await
}

pub async fn deployment_check_existence(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let deployment = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(RES, params).await?;
    let path = deployment_path(client.as_ref(), &rg, &deployment);
    check_existence(client.as_ref(), ArmRequest::head(path, api::RESOURCES), LOG, params).await
}

/// Validate, then deploy. A failed validation is returned as the result and
/// nothing is deployed.
pub async fn deployment_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let deployment = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(RES, params).await?;

    let props = deployment_properties(params)?;
    let properties = model_or_return!(RES, "DeploymentProperties", &props);

    let validation = deployment_validate(ctx, params).await?;
    if is_error(&validation) {
        return Ok(validation);
    }

    let path = deployment_path(client.as_ref(), &rg, &deployment);
    let request = ArmRequest::put(path, api::RESOURCES).body(json!({ "properties": properties }));
    fetch(client.as_ref(), request, LOG, params).await
}

pub async fn deployment_get(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let deployment = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(RES, params).await?;
    let path = deployment_path(client.as_ref(), &rg, &deployment);
    fetch(client.as_ref(), ArmRequest::get(path, api::RESOURCES), LOG, params).await
}

/// Cancel a running deployment: `{"result": true}`, or `{"result": false}`
/// with the error.
pub async fn deployment_cancel(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let deployment = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(RES, params).await?;
    let path = format!("{}/cancel", deployment_path(client.as_ref(), &rg, &deployment));
    Ok(
        match client
            .send(ArmRequest::post(path, api::RESOURCES))
            .await
            .cloud()?
        {
            Ok(_) => json!({ "result": true }),
            Err(exc) => {
                let mut failed = cloud_error(LOG, &exc, params);
                failed["result"] = json!(false);
                failed
            }
        },
    )
}

/// Ask the service whether a deployment would be accepted.
pub async fn deployment_validate(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let deployment = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(RES, params).await?;

    let props = deployment_properties(params)?;
    let properties = model_or_return!(RES, "DeploymentProperties", &props);

    let path = format!("{}/validate", deployment_path(client.as_ref(), &rg, &deployment));
    let request = ArmRequest::post(path, api::RESOURCES).body(json!({ "properties": properties }));
    Ok(match client.send(request).await.cloud()? {
        Ok(response) => as_dict(&response.body),
        Err(exc) => cloud_error(LOG, &exc, params),
    })
}

pub async fn deployment_export_template(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let deployment = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(RES, params).await?;
    let path = format!(
        "{}/exportTemplate",
        deployment_path(client.as_ref(), &rg, &deployment)
    );
    fetch(client.as_ref(), ArmRequest::post(path, api::RESOURCES), LOG, params).await
}

pub async fn deployments_list(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(RES, params).await?;
    let path = ids::provider(
        client.subscription_id(),
        &rg,
        "Microsoft.Resources",
        "deployments",
    );
    list_keyed(client.as_ref(), ArmRequest::get(path, api::RESOURCES), "name", LOG, params).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::arm::params_with;

    #[test]
    fn test_inline_template_wins_over_link() {
        let props = deployment_properties(&params_with(
            &ModuleParams::new(),
            &[
                ("deploy_template", json!({"resources": []})),
                ("template_link", json!("https://x/t.json")),
            ],
        ))
        .unwrap();
        assert_eq!(props["template"], json!({"resources": []}));
        assert!(!props.contains_key("template_link"));
        assert_eq!(props["mode"], json!("incremental"));
        assert_eq!(props["debug_setting"], json!({"detail_level": "none"}));
    }

    #[test]
    fn test_link_uri_and_missing_parameters() {
        let props = deployment_properties(&params_with(
            &ModuleParams::new(),
            &[("template_link", json!("https://x/t.json"))],
        ))
        .unwrap();
        assert_eq!(props["template_link"], json!({"uri": "https://x/t.json"}));
        assert!(!props.contains_key("parameters_link"));
    }

    #[test]
    fn test_no_template_fails_to_build() {
        let props = deployment_properties(&ModuleParams::new()).unwrap();
        let err =
            crate::azure::models::build_object_model(RES, "DeploymentProperties", &props)
                .unwrap_err();
        assert!(err.to_string().contains("'uri'"));
    }
}
