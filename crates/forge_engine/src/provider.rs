//! Provider interface used by the reference engine to talk to a cloud.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::EngineResult;

/// What a provider returns after creating or updating a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionedResource {
    pub id: String,
    /// Provider-computed properties, merged over the inputs.
    pub outputs: Map<String, Value>,
}

impl ProvisionedResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outputs: Map::new(),
        }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }
}

/// Cloud-side create/update/delete for custom resources.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create a resource from fully resolved inputs.
    async fn create(
        &self,
        type_token: &str,
        name: &str,
        inputs: &Map<String, Value>,
    ) -> EngineResult<ProvisionedResource>;

    /// Update an existing resource in place.
    ///
    /// Returns [`EngineError::ReplaceRequired`](crate::EngineError::ReplaceRequired)
    /// when the change touches a property that cannot be updated in place.
    async fn update(
        &self,
        type_token: &str,
        id: &str,
        inputs: &Map<String, Value>,
    ) -> EngineResult<ProvisionedResource>;

    /// Delete a resource.
    async fn delete(&self, type_token: &str, id: &str) -> EngineResult<()>;
}
