//! Component host for constructing components by type token.
//!
//! The host maps type tokens to constructors that take JSON arguments, so a
//! program (or a plugin front-end) can instantiate components it only knows
//! by name.

use std::collections::HashMap;

use forge_engine::{Context, PropertyMap, ResourceOptions, Urn};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::args::StorageAccountWithContainerArgs;
use crate::component::{
    ComponentState, StorageAccountWithContainer, EXPORT_CONTAINER_NAME,
    EXPORT_PRIMARY_BLOB_ENDPOINT, EXPORT_STORAGE_ACCOUNT_ID, EXPORT_STORAGE_ACCOUNT_NAME,
    STORAGE_ACCOUNT_WITH_CONTAINER_TYPE,
};
use crate::error::{ComponentError, ComponentResult};

/// Package name components are published under.
pub const PACKAGE_NAME: &str = "forge-components";

/// A constructed component, independent of its concrete type.
pub trait Component: Send + Sync {
    fn type_token(&self) -> &str;

    fn name(&self) -> &str;

    fn urn(&self) -> &Urn;

    /// Registered outputs keyed by export name.
    fn outputs(&self) -> PropertyMap;

    fn state(&self) -> ComponentState;

    /// Export every output under its export name.
    fn export_outputs(&self, ctx: &Context);
}

impl Component for StorageAccountWithContainer {
    fn type_token(&self) -> &str {
        STORAGE_ACCOUNT_WITH_CONTAINER_TYPE
    }

    fn name(&self) -> &str {
        StorageAccountWithContainer::name(self)
    }

    fn urn(&self) -> &Urn {
        StorageAccountWithContainer::urn(self)
    }

    fn outputs(&self) -> PropertyMap {
        StorageAccountWithContainer::outputs(self).to_property_map()
    }

    fn state(&self) -> ComponentState {
        StorageAccountWithContainer::state(self)
    }

    fn export_outputs(&self, ctx: &Context) {
        StorageAccountWithContainer::export_outputs(self, ctx);
    }
}

/// Builds a component from JSON arguments.
pub type ComponentConstructor =
    fn(&Context, &str, Value, ResourceOptions) -> ComponentResult<Box<dyn Component>>;

/// Description of a component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSchema {
    pub type_token: String,
    pub description: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

struct Registration {
    schema: ComponentSchema,
    constructor: ComponentConstructor,
}

/// A registry of component constructors.
pub struct ComponentHost {
    package: String,
    components: HashMap<String, Registration>,
}

impl ComponentHost {
    /// Create a new empty host.
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            components: HashMap::new(),
        }
    }

    /// Create a host with every built-in component registered.
    pub fn with_builtin_components() -> Self {
        let mut host = Self::new(PACKAGE_NAME);
        host.register(
            ComponentSchema {
                type_token: STORAGE_ACCOUNT_WITH_CONTAINER_TYPE.to_string(),
                description: "Azure storage account with a single blob container".to_string(),
                inputs: ["resourceGroupName", "location", "containerName", "sku", "tags"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                outputs: [
                    EXPORT_STORAGE_ACCOUNT_NAME,
                    EXPORT_STORAGE_ACCOUNT_ID,
                    EXPORT_CONTAINER_NAME,
                    EXPORT_PRIMARY_BLOB_ENDPOINT,
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            },
            construct_storage_account_with_container,
        );
        host
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Register a component type.
    ///
    /// A type already registered under the same token is replaced.
    pub fn register(&mut self, schema: ComponentSchema, constructor: ComponentConstructor) {
        debug!("Registering component type: {}", schema.type_token);
        self.components.insert(
            schema.type_token.clone(),
            Registration {
                schema,
                constructor,
            },
        );
    }

    /// Construct a component of `type_token`.
    pub fn construct(
        &self,
        ctx: &Context,
        type_token: &str,
        name: &str,
        args: Value,
        opts: ResourceOptions,
    ) -> ComponentResult<Box<dyn Component>> {
        let registration = self
            .components
            .get(type_token)
            .ok_or_else(|| ComponentError::UnknownComponentType(type_token.to_string()))?;
        debug!("Constructing {} as {}", name, type_token);
        (registration.constructor)(ctx, name, args, opts)
    }

    pub fn schema(&self, type_token: &str) -> Option<&ComponentSchema> {
        self.components.get(type_token).map(|r| &r.schema)
    }

    /// Schemas of every registered component, sorted by type token.
    pub fn schemas(&self) -> Vec<&ComponentSchema> {
        let mut schemas: Vec<_> = self.components.values().map(|r| &r.schema).collect();
        schemas.sort_by(|a, b| a.type_token.cmp(&b.type_token));
        schemas
    }

    pub fn contains(&self, type_token: &str) -> bool {
        self.components.contains_key(type_token)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Default for ComponentHost {
    fn default() -> Self {
        Self::with_builtin_components()
    }
}

impl std::fmt::Debug for ComponentHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentHost")
            .field("package", &self.package)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn construct_storage_account_with_container(
    ctx: &Context,
    name: &str,
    args: Value,
    opts: ResourceOptions,
) -> ComponentResult<Box<dyn Component>> {
    let args: StorageAccountWithContainerArgs = serde_json::from_value(args).map_err(|e| {
        ComponentError::invalid(format!(
            "arguments for {}: {}",
            STORAGE_ACCOUNT_WITH_CONTAINER_TYPE, e
        ))
    })?;
    let component = StorageAccountWithContainer::new(ctx, name, args, opts)?;
    Ok(Box::new(component))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use forge_engine::{LocalEngine, ResourceEngine};
    use serde_json::json;

    use crate::mock::MockAzureProvider;

    fn context() -> (Arc<LocalEngine>, Context) {
        let engine = Arc::new(LocalEngine::new(
            "dev",
            "demo",
            Arc::new(MockAzureProvider::new()),
        ));
        (engine.clone(), Context::new(engine))
    }

    #[test]
    fn test_builtin_components() {
        let host = ComponentHost::with_builtin_components();
        assert_eq!(host.package(), PACKAGE_NAME);
        assert_eq!(host.len(), 1);
        assert!(host.contains(STORAGE_ACCOUNT_WITH_CONTAINER_TYPE));

        let schema = host.schema(STORAGE_ACCOUNT_WITH_CONTAINER_TYPE).unwrap();
        assert!(schema.outputs.iter().any(|o| o == EXPORT_PRIMARY_BLOB_ENDPOINT));
    }

    #[test]
    fn test_construct_from_json() {
        let host = ComponentHost::default();
        let (engine, ctx) = context();

        let component = host
            .construct(
                &ctx,
                STORAGE_ACCOUNT_WITH_CONTAINER_TYPE,
                "data",
                json!({
                    "resourceGroupName": "demo-rg",
                    "location": "eastus",
                    "containerName": "mycontainer",
                }),
                ResourceOptions::new(),
            )
            .unwrap();

        assert_eq!(component.name(), "data");
        assert_eq!(component.state(), ComponentState::ChildrenRegistered);
        assert_eq!(component.outputs().len(), 4);
        assert_eq!(
            engine.resource_status(component.urn()),
            Some(forge_engine::ResourceStatus::Pending)
        );
    }

    #[test]
    fn test_unknown_type() {
        let host = ComponentHost::default();
        let (_, ctx) = context();
        let err = host
            .construct(&ctx, "nope:index:Nope", "x", json!({}), ResourceOptions::new())
            .err()
            .unwrap();
        assert!(matches!(err, ComponentError::UnknownComponentType(_)));
    }

    #[test]
    fn test_malformed_args_are_invalid_arguments() {
        let host = ComponentHost::default();
        let (engine, ctx) = context();
        let err = host
            .construct(
                &ctx,
                STORAGE_ACCOUNT_WITH_CONTAINER_TYPE,
                "x",
                json!({ "containerName": 5 }),
                ResourceOptions::new(),
            )
            .err()
            .unwrap();

        assert!(err.is_invalid_argument());
        assert!(engine.declared_resources().is_empty());
    }
}
