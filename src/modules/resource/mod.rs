//! `azurearm_resource` execution functions: resource groups, deployments,
//! subscriptions, policy, management locks and providers.

mod deployment;
mod group;
mod lock;
mod policy;

pub use deployment::*;
pub use group::*;
pub use lock::*;
pub use policy::*;

use super::{register_execution, ModuleRegistry};
use crate::azure::Service;

pub const MODULE: &str = "azurearm_resource";

/// Every function in this module reports provider errors as `resource`.
const LOG: Service = Service::Resource;

pub fn register(registry: &mut ModuleRegistry) {
    register_execution!(
        registry,
        MODULE,
        [
            resource_groups_list,
            resource_group_check_existence,
            resource_group_get,
            resource_group_create_or_update,
            resource_group_delete,
            deployment_operation_get,
            deployment_operations_list,
            deployment_delete,
            deployment_check_existence,
            deployment_create_or_update,
            deployment_get,
            deployment_cancel,
            deployment_validate,
            deployment_export_template,
            deployments_list,
            subscriptions_list_locations,
            subscription_get,
            subscriptions_list,
            tenants_list,
            policy_assignment_delete,
            policy_assignment_create,
            policy_assignment_get,
            policy_assignments_list_for_resource_group,
            policy_assignments_list,
            policy_definition_create_or_update,
            policy_definition_delete,
            policy_definition_get,
            policy_definitions_list,
            management_lock_create_or_update_at_resource_group_level,
            management_lock_delete_at_resource_group_level,
            management_lock_get_at_resource_group_level,
            management_lock_create_or_update_by_scope,
            management_lock_delete_by_scope,
            management_lock_get_by_scope,
            management_lock_create_or_update_at_resource_level,
            management_lock_delete_at_resource_level,
            management_lock_get_at_resource_level,
            management_lock_create_or_update_at_subscription_level,
            management_lock_delete_at_subscription_level,
            management_lock_get_at_subscription_level,
            management_locks_list_at_resource_group_level,
            management_locks_list_at_resource_level,
            management_locks_list_at_subscription_level,
            management_locks_list_by_scope,
            providers_list,
        ]
    );
}
