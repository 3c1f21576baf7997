//! # forge_azure
//!
//! Azure storage components for Forge.
//!
//! `StorageAccountWithContainer` declares a storage account and a blob
//! container as one unit: it validates its inputs, derives a unique account
//! name, wires the container to the account's pending name and exposes the
//! account name, account id, container name and blob endpoint as outputs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use forge_azure::{
//!     MockAzureProvider, StorageAccountWithContainer, StorageAccountWithContainerArgs,
//! };
//! use forge_engine::{Context, LocalEngine, ResourceOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = MockAzureProvider::new().with_existing_resource_group("demo-rg");
//! let engine = Arc::new(LocalEngine::new("dev", "demo", Arc::new(provider)));
//! let ctx = Context::new(engine.clone());
//!
//! let storage = StorageAccountWithContainer::new(
//!     &ctx,
//!     "neovasilidemo",
//!     StorageAccountWithContainerArgs::new("demo-rg", "eastus", "mycontainer"),
//!     ResourceOptions::new(),
//! )?;
//! storage.export_outputs(&ctx);
//!
//! engine.apply().await;
//! let outputs = storage.resolve_outputs().await?;
//! println!("{}", outputs.primary_blob_endpoint);
//! # Ok(())
//! # }
//! ```

pub mod args;
pub mod component;
pub mod error;
pub mod host;
pub mod mock;
pub mod naming;
pub mod region;
pub mod resources;
pub mod sku;

pub use args::{StorageAccountWithContainerArgs, ValidatedArgs};
pub use component::{
    ComponentState, ResolvedOutputs, StorageAccountWithContainer,
    StorageAccountWithContainerOutputs, STORAGE_ACCOUNT_WITH_CONTAINER_TYPE,
};
pub use error::{ComponentError, ComponentResult};
pub use host::{Component, ComponentConstructor, ComponentHost, ComponentSchema, PACKAGE_NAME};
pub use mock::{CapturedCall, MockAzureProvider};
pub use naming::derive_account_name;
pub use resources::{
    BlobContainer, BlobContainerArgs, ResourceGroup, ResourceGroupArgs, StorageAccount,
    StorageAccountArgs,
};
pub use sku::StorageSku;
