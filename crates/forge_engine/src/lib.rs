//! # forge_engine
//!
//! Pending values and the engine interface that Forge components register
//! against, plus an in-memory reference engine.
//!
//! ## Features
//!
//! - `Output<T>`: typed pending values that carry their dependency set
//! - `ResourceEngine`: registration API consumed by components
//! - `Context`: injected engine handle plus program exports
//! - `LocalEngine`: in-memory engine with diffing against a prior state
//! - `StateSnapshot`: JSON persisted state
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use forge_engine::{
//!     Context, LocalEngine, PropertyMap, Provisioner, ResourceEngine, ResourceOptions,
//! };
//!
//! # async fn run(provisioner: Arc<dyn Provisioner>) -> forge_engine::EngineResult<()> {
//! let engine = Arc::new(LocalEngine::new("dev", "demo", provisioner));
//! let ctx = Context::new(engine.clone());
//!
//! let group = ctx.engine().register_resource(
//!     "azure-native:resources:ResourceGroup",
//!     "demo-rg",
//!     PropertyMap::new().value("location", "eastus"),
//!     &ResourceOptions::new(),
//! )?;
//! ctx.export("resourceGroupId", &group.id);
//!
//! let summary = engine.apply().await;
//! assert!(summary.is_success());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod local;
pub mod output;
pub mod provider;
pub mod resource;
pub mod state;
pub mod urn;

pub use context::Context;
pub use engine::ResourceEngine;
pub use error::{EngineError, EngineResult, OutputError};
pub use local::{
    ApplySummary, DeclaredResource, LocalEngine, ProvisioningFailure, StepOp, StepRecord,
};
pub use output::{Output, OutputResolver};
pub use provider::{ProvisionedResource, Provisioner};
pub use resource::{PropertyMap, RegisteredResource, ResourceOptions, ResourceStatus};
pub use state::{ResourceSnapshot, StateSnapshot};
pub use urn::Urn;
