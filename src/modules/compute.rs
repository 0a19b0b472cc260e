//! `azurearm_compute` execution functions: availability sets, virtual
//! machines and images.

use serde_json::{json, Value};
use tracing::error;

use super::arm::{
    error_value, fetch, is_error, list_keyed, model_or_return, name, params_with, quiet,
    resource_group, send_bool, send_or_error, with_location,
};
use super::{register_execution, ModuleContext, ModuleParams, ModuleRegistry, ModuleResult, ParamExt};
use crate::azure::{api, ids, ArmClient, ArmRequest, Service};

pub const MODULE: &str = "azurearm_compute";

const COMP: Service = Service::Compute;
const PROVIDER: &str = "Microsoft.Compute";

fn compute_path(client: &dyn ArmClient, rg: &str, rest: &str) -> String {
    ids::provider(client.subscription_id(), rg, PROVIDER, rest)
}

fn vm_path(client: &dyn ArmClient, rg: &str, vm: &str) -> String {
    compute_path(client, rg, &format!("virtualMachines/{}", vm))
}

/// Create or update an availability set. Names in `virtual_machines` are
/// resolved to ids; names that cannot be found are dropped.
pub async fn availability_set_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let set = name(params)?;
    let rg = resource_group(params)?;
    let Some(mut kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(COMP, params).await?;

    if let Some(Value::Array(vms)) = params.get("virtual_machines") {
        let mut members = Vec::new();
        for vm in vms {
            let vm_name = match vm {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let found =
                virtual_machine_get(ctx, &params_with(params, &[("name", json!(vm_name))])).await?;
            if let Some(id) = found.get("id").filter(|_| !is_error(&found)) {
                members.push(json!({ "id": id }));
            }
        }
        kwargs.insert("virtual_machines".to_string(), Value::Array(members));
    }

    let body = model_or_return!(COMP, "AvailabilitySet", &kwargs);
    let path = compute_path(client.as_ref(), &rg, &format!("availabilitySets/{}", set));
    fetch(client.as_ref(), ArmRequest::put(path, api::COMPUTE).body(body), COMP, params).await
}

pub async fn availability_set_delete(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let set = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = compute_path(client.as_ref(), &rg, &format!("availabilitySets/{}", set));
    send_bool(client.as_ref(), ArmRequest::delete(path, api::COMPUTE), COMP, params).await
}

pub async fn availability_set_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let set = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = compute_path(client.as_ref(), &rg, &format!("availabilitySets/{}", set));
    fetch(client.as_ref(), ArmRequest::get(path, api::COMPUTE), COMP, params).await
}

pub async fn availability_sets_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = compute_path(client.as_ref(), &rg, "availabilitySets");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::COMPUTE), "name", COMP, params).await
}

/// VM sizes that can join an existing availability set, keyed by size name.
pub async fn availability_sets_list_available_sizes(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let set = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = compute_path(client.as_ref(), &rg, &format!("availabilitySets/{}/vmSizes", set));
    list_keyed(client.as_ref(), ArmRequest::get(path, api::COMPUTE), "name", COMP, params).await
}

/// Capture a generalized VM's disks as VHDs into `destination_name`.
pub async fn virtual_machine_capture(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let vm = name(params)?;
    let destination = params.get_string_required("destination_name")?;
    let rg = resource_group(params)?;
    let prefix = params
        .get_string("prefix")?
        .unwrap_or_else(|| "capture-".to_string());
    let overwrite = params.get_bool_or("overwrite", false);
    let client = ctx.client(COMP, params).await?;

    let capture: ModuleParams = [
        ("vhd_prefix".to_string(), json!(prefix)),
        ("destination_container_name".to_string(), json!(destination)),
        ("overwrite_vhds".to_string(), json!(overwrite)),
    ]
    .into_iter()
    .collect();
    let body = model_or_return!(COMP, "VirtualMachineCaptureParameters", &capture);
    let path = format!("{}/capture", vm_path(client.as_ref(), &rg, &vm));
    fetch(client.as_ref(), ArmRequest::post(path, api::COMPUTE).body(body), COMP, params).await
}

pub async fn virtual_machine_get(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let vm = name(params)?;
    let rg = resource_group(params)?;
    let expand = params.get_string("expand")?;
    let client = ctx.client(COMP, params).await?;
    let request =
        ArmRequest::get(vm_path(client.as_ref(), &rg, &vm), api::COMPUTE).query_opt("$expand", expand);
    fetch(client.as_ref(), request, COMP, params).await
}

/// POST a VM action whose answer is the updated VM.
async fn vm_action(ctx: &ModuleContext, params: &ModuleParams, action: &str) -> ModuleResult<Value> {
    let vm = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = format!("{}/{}", vm_path(client.as_ref(), &rg, &vm), action);
    fetch(client.as_ref(), ArmRequest::post(path, api::COMPUTE), COMP, params).await
}

pub async fn virtual_machine_convert_to_managed_disks(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    vm_action(ctx, params, "convertToManagedDisks").await
}

/// `true` once the VM is deallocated, or the error mapping.
pub async fn virtual_machine_deallocate(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let vm = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = format!("{}/deallocate", vm_path(client.as_ref(), &rg, &vm));
    send_or_error(client.as_ref(), ArmRequest::post(path, api::COMPUTE), COMP, params).await
}

pub async fn virtual_machine_generalize(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let vm = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = format!("{}/generalize", vm_path(client.as_ref(), &rg, &vm));
    send_bool(client.as_ref(), ArmRequest::post(path, api::COMPUTE), COMP, params).await
}

pub async fn virtual_machines_list(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = compute_path(client.as_ref(), &rg, "virtualMachines");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::COMPUTE), "name", COMP, params).await
}

pub async fn virtual_machines_list_all(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let client = ctx.client(COMP, params).await?;
    let path = format!(
        "{}/providers/{}/virtualMachines",
        ids::subscription(client.subscription_id()),
        PROVIDER
    );
    list_keyed(client.as_ref(), ArmRequest::get(path, api::COMPUTE), "name", COMP, params).await
}

pub async fn virtual_machines_list_available_sizes(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let vm = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = format!("{}/vmSizes", vm_path(client.as_ref(), &rg, &vm));
    list_keyed(client.as_ref(), ArmRequest::get(path, api::COMPUTE), "name", COMP, params).await
}

pub async fn virtual_machine_power_off(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    vm_action(ctx, params, "powerOff").await
}

pub async fn virtual_machine_restart(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    vm_action(ctx, params, "restart").await
}

pub async fn virtual_machine_start(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    vm_action(ctx, params, "start").await
}

pub async fn virtual_machine_redeploy(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    vm_action(ctx, params, "redeploy").await
}

/// `{"managed_disk": {"id"}}` or `{"snapshot": {"id"}}` depending on what
/// the id points at.
fn disk_source(id: &str) -> (&'static str, Value) {
    let kind = if id.to_ascii_lowercase().contains("/providers/microsoft.compute/snapshots/") {
        "snapshot"
    } else {
        "managed_disk"
    };
    (kind, json!({ "id": id }))
}

/// Storage profile keyword arguments from an OS disk id and data disk ids.
fn storage_profile(
    params: &ModuleParams,
    os_disk: &str,
) -> Result<serde_json::Map<String, Value>, String> {
    if !ids::is_valid_resource_id(os_disk) {
        return Err("The os_disk parameter is not a valid resource ID string.".to_string());
    }
    let os_type = match params.get("os_type") {
        Some(Value::String(t)) => t.clone(),
        _ => "Linux".to_string(),
    };
    let (kind, source) = disk_source(os_disk);
    let mut profile = serde_json::Map::new();
    profile.insert(
        "os_disk".to_string(),
        json!({ kind: source, "os_state": "Generalized", "os_type": os_type }),
    );

    let data_ids: Vec<String> = match params.get("data_disks") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(id)) => vec![id.clone()],
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(|i| i.as_str().map(str::to_string))
            .collect(),
        Some(_) => {
            return Err(
                "The data_disk parameter is a single resource ID string or a list of resource IDs."
                    .to_string(),
            )
        }
    };
    if !data_ids.is_empty() {
        let disks: Vec<Value> = data_ids
            .iter()
            .enumerate()
            .map(|(lun, id)| {
                let (kind, source) = disk_source(id);
                json!({ kind: source, "lun": lun })
            })
            .collect();
        profile.insert("data_disks".to_string(), Value::Array(disks));
    }
    profile.insert(
        "zone_resilient".to_string(),
        json!(params.get_bool_or("zone_resilient", false)),
    );
    Ok(profile)
}

/// Create or update an image from a source VM or from disk ids.
pub async fn image_create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let image = name(params)?;
    let rg = resource_group(params)?;
    let Some(mut kwargs) = with_location(ctx, params, &rg).await? else {
        return Ok(Value::Bool(false));
    };
    let client = ctx.client(COMP, params).await?;

    if let Some(source_vm) = params.get_string("source_vm")?.filter(|s| !s.is_empty()) {
        let group = params
            .get_string("source_vm_group")?
            .unwrap_or_else(|| rg.clone());
        let lookup = params_with(
            &quiet(params),
            &[("name", json!(source_vm)), ("resource_group", json!(group))],
        );
        let found = virtual_machine_get(ctx, &lookup).await?;
        let Some(id) = found.get("id").filter(|_| !is_error(&found)) else {
            let message = "The source virtual machine could not be found.";
            error!("{}", message);
            return Ok(error_value(message));
        };
        kwargs.insert("source_virtual_machine".to_string(), json!({ "id": id }));
    }

    if let Some(os_disk) = params.get_string("os_disk")?.filter(|s| !s.is_empty()) {
        match storage_profile(params, &os_disk) {
            Ok(profile) => {
                kwargs.insert("storage_profile".to_string(), Value::Object(profile));
            }
            Err(message) => {
                error!("{}", message);
                return Ok(error_value(message));
            }
        }
    }

    let body = model_or_return!(COMP, "Image", &kwargs);
    let path = compute_path(client.as_ref(), &rg, &format!("images/{}", image));
    fetch(client.as_ref(), ArmRequest::put(path, api::COMPUTE).body(body), COMP, params).await
}

pub async fn image_delete(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let image = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = compute_path(client.as_ref(), &rg, &format!("images/{}", image));
    send_bool(client.as_ref(), ArmRequest::delete(path, api::COMPUTE), COMP, params).await
}

pub async fn image_get(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let image = name(params)?;
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = compute_path(client.as_ref(), &rg, &format!("images/{}", image));
    fetch(client.as_ref(), ArmRequest::get(path, api::COMPUTE), COMP, params).await
}

pub async fn images_list_by_resource_group(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    let rg = resource_group(params)?;
    let client = ctx.client(COMP, params).await?;
    let path = compute_path(client.as_ref(), &rg, "images");
    list_keyed(client.as_ref(), ArmRequest::get(path, api::COMPUTE), "name", COMP, params).await
}

pub async fn images_list(ctx: &ModuleContext, params: &ModuleParams) -> ModuleResult<Value> {
    let client = ctx.client(COMP, params).await?;
    let path = format!(
        "{}/providers/{}/images",
        ids::subscription(client.subscription_id()),
        PROVIDER
    );
    list_keyed(client.as_ref(), ArmRequest::get(path, api::COMPUTE), "name", COMP, params).await
}

pub fn register(registry: &mut ModuleRegistry) {
    register_execution!(
        registry,
        MODULE,
        [
            availability_set_create_or_update,
            availability_set_delete,
            availability_set_get,
            availability_sets_list,
            availability_sets_list_available_sizes,
            virtual_machine_capture,
            virtual_machine_get,
            virtual_machine_convert_to_managed_disks,
            virtual_machine_deallocate,
            virtual_machine_generalize,
            virtual_machines_list,
            virtual_machines_list_all,
            virtual_machines_list_available_sizes,
            virtual_machine_power_off,
            virtual_machine_restart,
            virtual_machine_start,
            virtual_machine_redeploy,
            image_create_or_update,
            image_delete,
            image_get,
            images_list_by_resource_group,
            images_list,
        ]
    );
}
