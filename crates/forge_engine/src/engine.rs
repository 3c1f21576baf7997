//! The engine interface components register against.

use crate::error::EngineResult;
use crate::resource::{PropertyMap, RegisteredResource, ResourceOptions, ResourceStatus};
use crate::urn::Urn;

/// Registration API of an orchestration engine.
///
/// Registration is synchronous and never waits for provisioning: it records
/// intent and hands back pending outputs. Engines must derive URNs
/// deterministically from type, parent and name so that re-running a
/// program converges on the same resources.
pub trait ResourceEngine: Send + Sync {
    /// Register a logical component. It has no cloud-side representation.
    fn register_component(
        &self,
        type_token: &str,
        name: &str,
        opts: &ResourceOptions,
    ) -> EngineResult<Urn>;

    /// Register a custom (provider-backed) resource.
    fn register_resource(
        &self,
        type_token: &str,
        name: &str,
        props: PropertyMap,
        opts: &ResourceOptions,
    ) -> EngineResult<RegisteredResource>;

    /// Mark a component as done declaring children and record its outputs.
    fn register_outputs(&self, urn: &Urn, outputs: PropertyMap) -> EngineResult<()>;

    /// Current status of a declared resource.
    ///
    /// For components this is the aggregate over every descendant.
    fn resource_status(&self, urn: &Urn) -> Option<ResourceStatus>;
}
