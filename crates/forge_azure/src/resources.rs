//! Typed wrappers over the Azure resources the components are built from.
//!
//! Each wrapper turns its args into a [`PropertyMap`], registers it and
//! exposes the state properties callers need as typed outputs.

use std::collections::BTreeMap;

use forge_engine::{Context, EngineResult, Output, PropertyMap, ResourceOptions, Urn};
use serde_json::{Map, Value};

use crate::sku::StorageSku;

pub const RESOURCE_GROUP_TYPE: &str = "azure-native:resources:ResourceGroup";
pub const STORAGE_ACCOUNT_TYPE: &str = "azure-native:storage:StorageAccount";
pub const BLOB_CONTAINER_TYPE: &str = "azure-native:storage:BlobContainer";

/// Storage account kind used for general-purpose v2 accounts.
pub const STORAGE_V2: &str = "StorageV2";

/// Tags as a property value. Untagged resources carry no `tags` property.
fn tags_value(tags: &BTreeMap<String, String>) -> Option<Value> {
    (!tags.is_empty()).then(|| {
        Value::Object(
            tags.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<Map<String, Value>>(),
        )
    })
}

/// Arguments for a resource group.
#[derive(Debug, Clone, Default)]
pub struct ResourceGroupArgs {
    /// Physical name; the logical name is used when omitted.
    pub resource_group_name: Option<String>,
    pub location: String,
    pub tags: BTreeMap<String, String>,
}

/// A resource group.
#[derive(Debug, Clone)]
pub struct ResourceGroup {
    pub urn: Urn,
    pub id: Output<String>,
    pub name: Output<String>,
    pub location: Output<String>,
}

impl ResourceGroup {
    pub fn new(
        ctx: &Context,
        name: &str,
        args: ResourceGroupArgs,
        opts: &ResourceOptions,
    ) -> EngineResult<Self> {
        let physical_name = args
            .resource_group_name
            .unwrap_or_else(|| name.to_string());
        let props = PropertyMap::new()
            .value("resourceGroupName", physical_name)
            .value("location", args.location)
            .optional("tags", tags_value(&args.tags));

        let registered = ctx
            .engine()
            .register_resource(RESOURCE_GROUP_TYPE, name, props, opts)?;

        Ok(Self {
            name: registered.string_output("name"),
            location: registered.string_output("location"),
            id: registered.id,
            urn: registered.urn,
        })
    }
}

/// Arguments for a storage account.
#[derive(Debug, Clone)]
pub struct StorageAccountArgs {
    pub account_name: String,
    pub resource_group_name: String,
    pub location: String,
    pub sku: StorageSku,
    pub kind: String,
    pub tags: BTreeMap<String, String>,
}

/// A storage account.
#[derive(Debug, Clone)]
pub struct StorageAccount {
    pub urn: Urn,
    pub id: Output<String>,
    pub name: Output<String>,
    pub primary_blob_endpoint: Output<String>,
}

impl StorageAccount {
    pub fn new(
        ctx: &Context,
        name: &str,
        args: StorageAccountArgs,
        opts: &ResourceOptions,
    ) -> EngineResult<Self> {
        let mut sku = Map::new();
        sku.insert("name".to_string(), Value::String(args.sku.as_str().to_string()));

        let props = PropertyMap::new()
            .value("accountName", args.account_name)
            .value("resourceGroupName", args.resource_group_name)
            .value("location", args.location)
            .value("sku", Value::Object(sku))
            .value("kind", args.kind)
            .optional("tags", tags_value(&args.tags));

        let registered = ctx
            .engine()
            .register_resource(STORAGE_ACCOUNT_TYPE, name, props, opts)?;

        Ok(Self {
            name: registered.string_output("name"),
            primary_blob_endpoint: registered.nested_string_output(&["primaryEndpoints", "blob"]),
            id: registered.id,
            urn: registered.urn,
        })
    }
}

/// Arguments for a blob container. The account is usually another
/// resource's pending output.
#[derive(Debug, Clone)]
pub struct BlobContainerArgs {
    pub resource_group_name: String,
    pub account_name: Output<String>,
    pub container_name: String,
}

/// A blob container.
#[derive(Debug, Clone)]
pub struct BlobContainer {
    pub urn: Urn,
    pub id: Output<String>,
    pub name: Output<String>,
}

impl BlobContainer {
    pub fn new(
        ctx: &Context,
        name: &str,
        args: BlobContainerArgs,
        opts: &ResourceOptions,
    ) -> EngineResult<Self> {
        let props = PropertyMap::new()
            .value("resourceGroupName", args.resource_group_name)
            .output("accountName", &args.account_name)
            .value("containerName", args.container_name);

        let registered = ctx
            .engine()
            .register_resource(BLOB_CONTAINER_TYPE, name, props, opts)?;

        Ok(Self {
            name: registered.string_output("name"),
            id: registered.id,
            urn: registered.urn,
        })
    }
}
