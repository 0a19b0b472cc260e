//! Azure Resource Manager collaborators.
//!
//! Everything the execution and state functions need from the outside world
//! lives here:
//!
//! - [`client`]: the [`ArmClient`] seam, the reqwest-backed [`RestClient`]
//!   with long-running operation polling, and the [`ClientFactory`]
//! - [`auth`]: connection parameters, cloud environments and token credentials
//! - [`models`]: building request bodies from keyword arguments and
//!   normalizing responses into snake_case mappings
//! - [`paging`]: materializing `nextLink` paged collections
//! - [`logging`]: the structured cloud error log line
//! - [`memory`]: an in-memory control plane used for tests and rehearsals

pub mod auth;
pub mod client;
pub mod error;
pub mod logging;
pub mod memory;
pub mod models;
pub mod paging;

pub use auth::{CloudEnvironment, ConnectionAuth};
pub use client::{
    ArmClient, ArmRequest, ArmResponse, ClientConfig, ClientFactory, DefaultClientFactory, Method,
    RestClient,
};
pub use error::{ArmError, AuthError, CloudError, ModelError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The Resource Manager service family a call belongs to.
///
/// All services share the same ARM endpoint; the distinction only matters for
/// log lines and for choosing API versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Network,
    Compute,
    Resource,
    Subscription,
    Policy,
    ManagementLock,
    Monitor,
    Authorization,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Network => "network",
            Service::Compute => "compute",
            Service::Resource => "resource",
            Service::Subscription => "subscription",
            Service::Policy => "policy",
            Service::ManagementLock => "managementlock",
            Service::Monitor => "monitor",
            Service::Authorization => "authorization",
        }
    }
}

impl fmt::Display for Service {
    /// Capitalized form used in log lines (`Network`, `Managementlock`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => write!(f, "{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => Ok(()),
        }
    }
}

/// API versions used per resource type.
pub mod api {
    pub const NETWORK: &str = "2023-09-01";
    pub const COMPUTE: &str = "2023-09-01";
    pub const RESOURCES: &str = "2022-09-01";
    pub const SUBSCRIPTIONS: &str = "2022-12-01";
    pub const POLICY: &str = "2021-06-01";
    pub const LOCKS: &str = "2016-09-01";
    pub const DIAGNOSTIC_SETTINGS: &str = "2021-05-01-preview";
    pub const LOG_PROFILES: &str = "2016-03-01";
    pub const PROVIDER_OPERATIONS: &str = "2015-07-01";
    pub const ROLE_ASSIGNMENTS: &str = "2022-04-01";
}

/// Resource id helpers.
pub mod ids {
    /// `/subscriptions/{sub}`
    pub fn subscription(subscription_id: &str) -> String {
        format!("/subscriptions/{}", subscription_id)
    }

    /// `/subscriptions/{sub}/resourceGroups/{rg}`
    pub fn resource_group(subscription_id: &str, resource_group: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            subscription_id, resource_group
        )
    }

    /// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{provider}/{rest}`
    ///
    /// `rest` is joined verbatim, e.g. `virtualNetworks/vnet1/subnets/sn1`.
    pub fn provider(
        subscription_id: &str,
        resource_group: &str,
        provider: &str,
        rest: &str,
    ) -> String {
        format!(
            "{}/providers/{}/{}",
            self::resource_group(subscription_id, resource_group),
            provider,
            rest.trim_start_matches('/')
        )
    }

    /// Last path segment of a resource id, which is the resource name.
    pub fn name_from_id(id: &str) -> &str {
        id.rsplit('/').next().unwrap_or(id)
    }

    /// Loose check for an ARM resource id string.
    pub fn is_valid_resource_id(id: &str) -> bool {
        let parts: Vec<&str> = id.trim_start_matches('/').split('/').collect();
        id.starts_with('/')
            && parts.len() >= 8
            && parts[0].eq_ignore_ascii_case("subscriptions")
            && parts[2].eq_ignore_ascii_case("resourceGroups")
            && parts[4].eq_ignore_ascii_case("providers")
            && parts.iter().all(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_display() {
        assert_eq!(Service::Network.to_string(), "Network");
        assert_eq!(Service::ManagementLock.to_string(), "Managementlock");
    }

    #[test]
    fn test_provider_id() {
        assert_eq!(
            ids::provider("sub", "rg", "Microsoft.Network", "virtualNetworks/vnet1"),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1"
        );
        assert_eq!(
            ids::provider("sub", "rg", "Microsoft.Compute", "/disks/d1"),
            format!("{}/providers/Microsoft.Compute/disks/d1", ids::resource_group("sub", "rg"))
        );
    }

    #[test]
    fn test_resource_id_validation() {
        assert!(ids::is_valid_resource_id(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/disks/d1"
        ));
        assert!(!ids::is_valid_resource_id("disk1"));
        assert!(!ids::is_valid_resource_id("/subscriptions/s/resourceGroups/rg"));
        assert_eq!(ids::name_from_id("/a/b/c/nsg1"), "nsg1");
    }
}
