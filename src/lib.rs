//! # azurearm - Azure Resource Manager execution and state functions
//!
//! azurearm exposes Azure Resource Manager operations as named async
//! functions taking keyword arguments, plus idempotent *state* functions
//! that converge a resource towards a desired shape.
//!
//! ## Core Concepts
//!
//! - **Execution functions**: one ARM call (or a short sequence of them) each,
//!   returning normalized snake_case JSON, or `{"error": ...}` when the
//!   service rejects the call
//! - **State functions**: `*_present` / `*_absent` pairs that fetch, compare
//!   and create or delete, reporting a [`states::StateReturn`]
//! - **Connection auth**: the credential bundle every call carries, given
//!   inline or through a named profile
//! - **Registry**: every function by `module.function` name
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 CLI (call / apply / functions)            │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Module Registry                        │
//! │      azurearm_network / _resource / _compute / ...         │
//! └──────────────────────────────────────────────────────────┘
//!            │                                   │
//!            ▼                                   ▼
//! ┌────────────────────────┐         ┌────────────────────────┐
//! │   State functions      │ ──────▶ │  Execution functions   │
//! │  (fetch, diff, apply)  │         │ (models, paging, LRO)  │
//! └────────────────────────┘         └────────────────────────┘
//!                                                │
//!                                                ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │           ArmClient (reqwest REST client / memory)        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use azurearm::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let factory = DefaultClientFactory::new(ClientConfig::default())?;
//!     let ctx = ModuleContext::new(Arc::new(factory));
//!     let registry = ModuleRegistry::with_builtins();
//!
//!     let mut params = ModuleParams::new();
//!     params.insert("name".into(), json!("rg1"));
//!     params.insert("location".into(), json!("eastus"));
//!     params.insert("connection_auth".into(), json!({"subscription_id": "..."}));
//!
//!     let ret = registry
//!         .call_state("azurearm_resource.resource_group_present", &ctx, &params)
//!         .await?;
//!     println!("{}: {}", ret.status(), ret.comment);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::azure::{
        ArmClient, ArmRequest, ArmResponse, ClientConfig, ClientFactory, ConnectionAuth,
        DefaultClientFactory, Method,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::modules::{
        Function, ModuleContext, ModuleError, ModuleParams, ModuleRegistry, ModuleResult,
        ParamExt,
    };
    pub use crate::states::{StateReturn, StateStatus};
}

// ============================================================================
// Core
// ============================================================================

/// Error types.
pub mod error;

/// Configuration files, profiles and environment overrides.
pub mod config;

// ============================================================================
// Resource Manager
// ============================================================================

/// Clients, credentials, models and paging.
pub mod azure;

/// Execution functions and the registry.
pub mod modules;

/// State functions and the comparison engine.
pub mod states;

pub use error::{Error, Result};
pub use modules::ModuleRegistry;
pub use states::StateReturn;

/// Version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
