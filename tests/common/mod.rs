//! Shared test utilities for the azurearm test suite.
//!
//! This module provides:
//! - An in-memory control plane wired into a [`ModuleContext`]
//! - Resource id builders
//! - Keyword-argument builders for execution and state calls
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};

use azurearm::azure::memory::{MemoryClient, MemoryClientFactory};
use azurearm::modules::{ModuleContext, ModuleParams, ModuleRegistry};

pub const SUB: &str = "00000000-0000-0000-0000-000000000001";
pub const RG: &str = "rg1";
pub const LOCATION: &str = "eastus";

// ============================================================================
// Harness
// ============================================================================

/// An empty control plane and a context that talks to it.
pub struct Harness {
    pub client: Arc<MemoryClient>,
    pub ctx: ModuleContext,
    pub registry: ModuleRegistry,
}

impl Harness {
    pub fn new() -> Self {
        let client = Arc::new(MemoryClient::new(SUB));
        let ctx = ModuleContext::new(Arc::new(MemoryClientFactory::new(client.clone())));
        Self {
            client,
            ctx,
            registry: ModuleRegistry::with_builtins(),
        }
    }

    /// Harness with resource group [`RG`] in [`LOCATION`].
    pub fn with_group() -> Self {
        let harness = Self::new();
        harness
            .client
            .seed(&group_id(RG), json!({ "location": LOCATION }));
        harness
    }

    /// Same control plane, test mode on.
    pub fn checking(&self) -> ModuleContext {
        self.ctx.clone().with_check_mode(true)
    }

    pub async fn call(&self, name: &str, params: &ModuleParams) -> Value {
        self.registry
            .call(name, &self.ctx, params)
            .await
            .unwrap_or_else(|e| panic!("{} failed: {}", name, e))
    }

    pub async fn state(
        &self,
        name: &str,
        params: &ModuleParams,
    ) -> azurearm::states::StateReturn {
        self.registry
            .call_state(name, &self.ctx, params)
            .await
            .unwrap_or_else(|e| panic!("{} failed: {}", name, e))
    }
}

// ============================================================================
// Resource ids
// ============================================================================

pub fn group_id(rg: &str) -> String {
    format!("/subscriptions/{}/resourceGroups/{}", SUB, rg)
}

/// Id of a resource of `provider` in resource group [`RG`], e.g.
/// `provider_id("Microsoft.Network", "virtualNetworks/vnet1")`.
pub fn provider_id(provider: &str, rest: &str) -> String {
    format!("{}/providers/{}/{}", group_id(RG), provider, rest)
}

pub fn network_id(rest: &str) -> String {
    provider_id("Microsoft.Network", rest)
}

// ============================================================================
// Keyword arguments
// ============================================================================

/// Keyword arguments for an execution function, with the connection keys.
pub fn exec_params(value: Value) -> ModuleParams {
    let mut params = to_params(value);
    params.insert("subscription_id".to_string(), json!(SUB));
    params
}

/// Keyword arguments for a state function, with `connection_auth`.
pub fn state_params(value: Value) -> ModuleParams {
    let mut params = to_params(value);
    params.insert(
        "connection_auth".to_string(),
        json!({ "subscription_id": SUB }),
    );
    params
}

pub fn to_params(value: Value) -> ModuleParams {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        other => panic!("keyword arguments must be a mapping, got {}", other),
    }
}
