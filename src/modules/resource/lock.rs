//! Management locks at subscription, resource group, resource and arbitrary
//! scope level.
//!
//! Lock deletes report provider errors as an error mapping rather than
//! `false`, and lock lists are plain lists.

use serde_json::{json, Value};

use super::LOG;
use crate::azure::{api, ids, ArmClient, ArmRequest, Service};
use crate::modules::arm::{
    fetch, list_plain, model_or_return, name, params_with, resource_group, send_or_error,
};
use crate::modules::{ModuleContext, ModuleParams, ModuleResult, ParamExt};

const LOCKS: Service = Service::ManagementLock;

const LOCK_PROVIDER: &str = "providers/Microsoft.Authorization/locks";

/// Where a lock lives.
enum Level {
    Subscription,
    ResourceGroup(String),
    Resource {
        group: String,
        namespace: String,
        parent: String,
        kind: String,
        resource: String,
    },
    Scope(String),
}

impl Level {
    fn resource(params: &ModuleParams) -> ModuleResult<Self> {
        Ok(Level::Resource {
            group: resource_group(params)?,
            namespace: params.get_string_required("resource_provider_namespace")?,
            parent: params.get_string("parent_resource_path")?.unwrap_or_default(),
            kind: params.get_string_required("resource_type")?,
            resource: params.get_string_required("resource")?,
        })
    }

    /// Path of the lock collection at this level.
    fn collection(&self, client: &dyn ArmClient) -> String {
        let subscription = client.subscription_id();
        match self {
            Level::Subscription => {
                format!("{}/{}", ids::subscription(subscription), LOCK_PROVIDER)
            }
            Level::ResourceGroup(group) => {
                format!("{}/{}", ids::resource_group(subscription, group), LOCK_PROVIDER)
            }
            Level::Resource {
                group,
                namespace,
                parent,
                kind,
                resource,
            } => {
                let parent = parent.trim_matches('/');
                let rest = if parent.is_empty() {
                    format!("{}/{}", kind, resource)
                } else {
                    format!("{}/{}/{}", parent, kind, resource)
                };
                format!(
                    "{}/{}",
                    ids::provider(subscription, group, namespace, &rest),
                    LOCK_PROVIDER
                )
            }
            Level::Scope(scope) => format!("{}/{}", scope.trim_end_matches('/'), LOCK_PROVIDER),
        }
    }
}

async fn create_or_update(
    ctx: &ModuleContext,
    params: &ModuleParams,
    level: Level,
) -> ModuleResult<Value> {
    let lock = name(params)?;
    let lock_level = params.get_string_required("lock_level")?;
    let client = ctx.client(LOCKS, params).await?;
    let kwargs = params_with(params, &[("level", json!(lock_level))]);
    let body = model_or_return!(LOCKS, "ManagementLockObject", &kwargs);
    let path = format!("{}/{}", level.collection(client.as_ref()), lock);
    fetch(client.as_ref(), ArmRequest::put(path, api::LOCKS).body(body), LOG, params).await
}

async fn delete(ctx: &ModuleContext, params: &ModuleParams, level: Level) -> ModuleResult<Value> {
    let lock = name(params)?;
    let client = ctx.client(LOCKS, params).await?;
    let path = format!("{}/{}", level.collection(client.as_ref()), lock);
    send_or_error(client.as_ref(), ArmRequest::delete(path, api::LOCKS), LOG, params).await
}

async fn get(ctx: &ModuleContext, params: &ModuleParams, level: Level) -> ModuleResult<Value> {
    let lock = name(params)?;
    let client = ctx.client(LOCKS, params).await?;
    let path = format!("{}/{}", level.collection(client.as_ref()), lock);
    fetch(client.as_ref(), ArmRequest::get(path, api::LOCKS), LOG, params).await
}

async fn list(ctx: &ModuleContext, params: &ModuleParams, level: Level) -> ModuleResult<Value> {
    let filter = params.get_string("filter")?;
    let client = ctx.client(LOCKS, params).await?;
    let request =
        ArmRequest::get(level.collection(client.as_ref()), api::LOCKS).query_opt("$filter", filter);
    list_plain(client.as_ref(), request, LOG, params).await
}

pub async fn management_lock_create_or_update_at_resource_group_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    create_or_update(ctx, params, Level::ResourceGroup(resource_group(params)?)).await
}

pub async fn management_lock_delete_at_resource_group_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    delete(ctx, params, Level::ResourceGroup(resource_group(params)?)).await
}

pub async fn management_lock_get_at_resource_group_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    get(ctx, params, Level::ResourceGroup(resource_group(params)?)).await
}

pub async fn management_lock_create_or_update_by_scope(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    create_or_update(ctx, params, Level::Scope(params.get_string_required("scope")?)).await
}

pub async fn management_lock_delete_by_scope(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    delete(ctx, params, Level::Scope(params.get_string_required("scope")?)).await
}

pub async fn management_lock_get_by_scope(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    get(ctx, params, Level::Scope(params.get_string_required("scope")?)).await
}

pub async fn management_lock_create_or_update_at_resource_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    create_or_update(ctx, params, Level::resource(params)?).await
}

pub async fn management_lock_delete_at_resource_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    delete(ctx, params, Level::resource(params)?).await
}

pub async fn management_lock_get_at_resource_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    get(ctx, params, Level::resource(params)?).await
}

pub async fn management_lock_create_or_update_at_subscription_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    create_or_update(ctx, params, Level::Subscription).await
}

pub async fn management_lock_delete_at_subscription_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    delete(ctx, params, Level::Subscription).await
}

pub async fn management_lock_get_at_subscription_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    get(ctx, params, Level::Subscription).await
}

pub async fn management_locks_list_at_resource_group_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    list(ctx, params, Level::ResourceGroup(resource_group(params)?)).await
}

pub async fn management_locks_list_at_resource_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    list(ctx, params, Level::resource(params)?).await
}

pub async fn management_locks_list_at_subscription_level(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    list(ctx, params, Level::Subscription).await
}

pub async fn management_locks_list_by_scope(
    ctx: &ModuleContext,
    params: &ModuleParams,
) -> ModuleResult<Value> {
    list(ctx, params, Level::Scope(params.get_string_required("scope")?)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::memory::MemoryClient;

    #[test]
    fn test_resource_level_path_with_parent() {
        let client = MemoryClient::new("sub");
        let level = Level::Resource {
            group: "rg".to_string(),
            namespace: "Microsoft.Network".to_string(),
            parent: "virtualNetworks/vnet1".to_string(),
            kind: "subnets".to_string(),
            resource: "sn1".to_string(),
        };
        assert_eq!(
            level.collection(&client),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/sn1/providers/Microsoft.Authorization/locks"
        );
    }

    #[test]
    fn test_subscription_level_path() {
        let client = MemoryClient::new("sub");
        assert_eq!(
            Level::Subscription.collection(&client),
            "/subscriptions/sub/providers/Microsoft.Authorization/locks"
        );
    }
}
