//! `StorageAccountWithContainer`: a storage account and one blob container
//! declared and tracked as a single unit.
//!
//! The container is declared as a child of the account and receives the
//! account's *pending* name output, so the engine cannot create it before the
//! account exists. Construction only declares; it never waits for
//! provisioning.

use std::sync::Arc;

use forge_engine::{
    Context, Output, OutputError, PropertyMap, ResourceEngine, ResourceOptions, ResourceStatus, Urn,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::args::{StorageAccountWithContainerArgs, ValidatedArgs};
use crate::error::{ComponentError, ComponentResult};
use crate::naming::derive_account_name;
use crate::resources::{
    BlobContainer, BlobContainerArgs, StorageAccount, StorageAccountArgs, STORAGE_V2,
};

/// Type token the component registers under.
pub const STORAGE_ACCOUNT_WITH_CONTAINER_TYPE: &str =
    "forge-components:index:StorageAccountWithContainer";

/// Export keys of the output contract.
pub const EXPORT_STORAGE_ACCOUNT_NAME: &str = "storageAccountName";
pub const EXPORT_STORAGE_ACCOUNT_ID: &str = "storageAccountId";
pub const EXPORT_CONTAINER_NAME: &str = "containerName";
pub const EXPORT_PRIMARY_BLOB_ENDPOINT: &str = "primaryBlobEndpoint";

/// Lifecycle of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    /// Registered with the engine, children not declared yet.
    Declared,
    /// Children and outputs registered, engine has not started on them.
    ChildrenRegistered,
    /// The engine is provisioning the children.
    Resolving,
    /// Every child provisioned, outputs resolved.
    Ready,
    /// A child failed. Terminal; a corrective re-run is the only way out.
    Failed,
}

impl ComponentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ComponentState::Ready | ComponentState::Failed)
    }
}

/// Output contract: values that resolve once the children are provisioned.
#[derive(Debug, Clone)]
pub struct StorageAccountWithContainerOutputs {
    pub storage_account_name: Output<String>,
    pub storage_account_id: Output<String>,
    pub container_name: Output<String>,
    pub primary_blob_endpoint: Output<String>,
}

impl StorageAccountWithContainerOutputs {
    /// The outputs keyed by their export names.
    pub fn to_property_map(&self) -> PropertyMap {
        PropertyMap::new()
            .output(EXPORT_STORAGE_ACCOUNT_NAME, &self.storage_account_name)
            .output(EXPORT_STORAGE_ACCOUNT_ID, &self.storage_account_id)
            .output(EXPORT_CONTAINER_NAME, &self.container_name)
            .output(EXPORT_PRIMARY_BLOB_ENDPOINT, &self.primary_blob_endpoint)
    }
}

/// Resolved output contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOutputs {
    pub storage_account_name: String,
    pub storage_account_id: String,
    pub container_name: String,
    pub primary_blob_endpoint: String,
}

/// A storage account with one blob container.
pub struct StorageAccountWithContainer {
    name: String,
    urn: Urn,
    account_urn: Urn,
    container_urn: Urn,
    outputs: StorageAccountWithContainerOutputs,
    engine: Arc<dyn ResourceEngine>,
}

impl StorageAccountWithContainer {
    /// Validate `args`, then declare the component and its two children.
    ///
    /// Invalid arguments fail with [`ComponentError::InvalidArgument`] before
    /// anything is registered. Registration failures surface as
    /// [`ComponentError::EngineRegistration`]. Provisioning failures only
    /// surface later, through [`StorageAccountWithContainer::resolve_outputs`].
    pub fn new(
        ctx: &Context,
        name: &str,
        args: StorageAccountWithContainerArgs,
        opts: ResourceOptions,
    ) -> ComponentResult<Self> {
        if name.trim().is_empty() {
            return Err(ComponentError::invalid("component name must not be empty"));
        }
        let args = args.validate()?;
        let mut state = ComponentState::Declared;

        let urn = ctx
            .engine()
            .register_component(STORAGE_ACCOUNT_WITH_CONTAINER_TYPE, name, &opts)
            .map_err(|e| ComponentError::registration(name, e))?;
        debug!("{} {:?}", urn, state);

        let (account, container) = Self::declare_children(ctx, name, &urn, &opts, args)?;

        let outputs = StorageAccountWithContainerOutputs {
            storage_account_name: account.name,
            storage_account_id: account.id,
            container_name: container.name,
            primary_blob_endpoint: account.primary_blob_endpoint,
        };

        ctx.engine()
            .register_outputs(&urn, outputs.to_property_map())
            .map_err(|e| ComponentError::registration(name, e))?;
        state = ComponentState::ChildrenRegistered;

        info!(
            "Declared {} ({} -> {}), {:?}",
            name, account.urn, container.urn, state
        );

        Ok(Self {
            name: name.to_string(),
            urn,
            account_urn: account.urn,
            container_urn: container.urn,
            outputs,
            engine: ctx.engine_handle(),
        })
    }

    fn declare_children(
        ctx: &Context,
        name: &str,
        urn: &Urn,
        opts: &ResourceOptions,
        args: ValidatedArgs,
    ) -> ComponentResult<(StorageAccount, BlobContainer)> {
        let account_name = derive_account_name(name);
        debug!("Derived account name {} for {}", account_name, name);

        let account = StorageAccount::new(
            ctx,
            &format!("{}-sa", name),
            StorageAccountArgs {
                account_name,
                resource_group_name: args.resource_group_name.clone(),
                location: args.location,
                sku: args.sku,
                kind: STORAGE_V2.to_string(),
                tags: args.tags,
            },
            &opts.inherit(urn),
        )
        .map_err(|e| ComponentError::registration(name, e))?;

        let container = BlobContainer::new(
            ctx,
            &format!("{}-container", name),
            BlobContainerArgs {
                resource_group_name: args.resource_group_name,
                account_name: account.name.clone(),
                container_name: args.container_name,
            },
            &opts.inherit(&account.urn),
        )
        .map_err(|e| ComponentError::registration(name, e))?;

        Ok((account, container))
    }

    /// Logical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn storage_account_urn(&self) -> &Urn {
        &self.account_urn
    }

    pub fn container_urn(&self) -> &Urn {
        &self.container_urn
    }

    pub fn outputs(&self) -> &StorageAccountWithContainerOutputs {
        &self.outputs
    }

    pub fn storage_account_name(&self) -> &Output<String> {
        &self.outputs.storage_account_name
    }

    pub fn storage_account_id(&self) -> &Output<String> {
        &self.outputs.storage_account_id
    }

    pub fn container_name(&self) -> &Output<String> {
        &self.outputs.container_name
    }

    pub fn primary_blob_endpoint(&self) -> &Output<String> {
        &self.outputs.primary_blob_endpoint
    }

    /// Current lifecycle state, derived from what the engine reports for the
    /// children.
    pub fn state(&self) -> ComponentState {
        let statuses = [
            self.engine.resource_status(&self.account_urn),
            self.engine.resource_status(&self.container_urn),
        ];

        if statuses.contains(&Some(ResourceStatus::Failed)) {
            ComponentState::Failed
        } else if statuses.iter().all(|s| *s == Some(ResourceStatus::Ready)) {
            ComponentState::Ready
        } else if statuses
            .iter()
            .any(|s| matches!(s, Some(ResourceStatus::Provisioning | ResourceStatus::Ready)))
        {
            ComponentState::Resolving
        } else {
            ComponentState::ChildrenRegistered
        }
    }

    /// Export the output contract under its well-known keys.
    pub fn export_outputs(&self, ctx: &Context) {
        ctx.export(EXPORT_STORAGE_ACCOUNT_NAME, &self.outputs.storage_account_name);
        ctx.export(EXPORT_STORAGE_ACCOUNT_ID, &self.outputs.storage_account_id);
        ctx.export(EXPORT_CONTAINER_NAME, &self.outputs.container_name);
        ctx.export(EXPORT_PRIMARY_BLOB_ENDPOINT, &self.outputs.primary_blob_endpoint);
    }

    /// Wait for every output. A child failure is reported with the
    /// component's name and the failing child.
    pub async fn resolve_outputs(&self) -> ComponentResult<ResolvedOutputs> {
        let resolve = |child: &Urn, result: Result<String, OutputError>| {
            result.map_err(|e| ComponentError::child(&self.name, child, e))
        };
        let account = &self.account_urn;
        let outputs = &self.outputs;

        Ok(ResolvedOutputs {
            storage_account_id: resolve(account, outputs.storage_account_id.resolve().await)?,
            storage_account_name: resolve(account, outputs.storage_account_name.resolve().await)?,
            primary_blob_endpoint: resolve(account, outputs.primary_blob_endpoint.resolve().await)?,
            container_name: resolve(&self.container_urn, outputs.container_name.resolve().await)?,
        })
    }
}

impl std::fmt::Debug for StorageAccountWithContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAccountWithContainer")
            .field("name", &self.name)
            .field("urn", &self.urn)
            .finish_non_exhaustive()
    }
}
