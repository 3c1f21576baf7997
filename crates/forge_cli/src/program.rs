//! Declaring a program against the local engine.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use forge_azure::region::normalize_region;
use forge_azure::{
    Component, ComponentHost, MockAzureProvider, ResourceGroup, ResourceGroupArgs,
};
use forge_engine::{
    Context, LocalEngine, ProvisionedResource, ResourceOptions, StateSnapshot,
};
use tracing::debug;

use crate::config::ProgramConfig;

/// Simulated cloud that already holds everything recorded in `state`.
pub fn provider_for(state: &StateSnapshot) -> MockAzureProvider {
    state
        .resources
        .iter()
        .filter_map(|r| r.id.as_ref().map(|id| (r, id)))
        .fold(MockAzureProvider::new(), |provider, (resource, id)| {
            debug!("Seeding {} from state", resource.urn);
            provider.with_existing_resource(
                &resource.type_token,
                &ProvisionedResource {
                    id: id.clone(),
                    outputs: resource.outputs.clone(),
                },
            )
        })
}

/// A declared program, ready to apply.
pub struct Program {
    pub engine: Arc<LocalEngine>,
    pub ctx: Context,
    pub provider: MockAzureProvider,
    pub components: Vec<Box<dyn Component>>,
}

impl Program {
    /// An engine for `config` that diffs against `prior`, with nothing
    /// declared yet.
    pub fn empty(config: &ProgramConfig, prior: StateSnapshot) -> Self {
        let provider = provider_for(&prior);
        let engine = Arc::new(
            LocalEngine::new(&config.stack, &config.project, Arc::new(provider.clone()))
                .with_state(prior),
        );
        Self {
            ctx: Context::new(engine.clone()),
            engine,
            provider,
            components: Vec::new(),
        }
    }

    /// Declare the resource group and every component of `config`.
    pub fn declare(config: &ProgramConfig, prior: StateSnapshot) -> Result<Self> {
        let mut program = Self::empty(config, prior);
        let host = ComponentHost::default();

        let group = ResourceGroup::new(
            &program.ctx,
            &config.resource_group.name,
            ResourceGroupArgs {
                resource_group_name: Some(config.resource_group.name.clone()),
                location: normalize_region(&config.resource_group.location),
                tags: config.resource_group.tags.clone(),
            },
            &ResourceOptions::new(),
        )
        .with_context(|| {
            format!(
                "Failed to declare resource group {}",
                config.resource_group.name
            )
        })?;

        for component in &config.components {
            let declared = host
                .construct(
                    &program.ctx,
                    &component.type_token,
                    &component.name,
                    config.component_args(component),
                    ResourceOptions::new().depends_on(&group.urn),
                )
                .with_context(|| format!("Failed to declare component {}", component.name))?;
            program.components.push(declared);
        }

        program.export_outputs();
        Ok(program)
    }

    /// Export component outputs. A lone component exports under the plain
    /// keys; several are prefixed with their names.
    fn export_outputs(&self) {
        if let [component] = self.components.as_slice() {
            component.export_outputs(&self.ctx);
            return;
        }
        for component in &self.components {
            for (key, output) in component.outputs().iter() {
                self.ctx
                    .export(format!("{}.{}", component.name(), key), output);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_azure::ComponentState;
    use forge_engine::StepOp;

    #[tokio::test]
    async fn test_demo_program_converges() {
        let config = ProgramConfig::demo();

        let first = Program::declare(&config, StateSnapshot::new()).unwrap();
        let summary = first.engine.apply().await;
        assert!(summary.is_success());
        assert_eq!(summary.count(StepOp::Create), 3);
        assert_eq!(first.components[0].state(), ComponentState::Ready);

        let exports = first.ctx.resolve_exports().await.unwrap();
        assert_eq!(exports["containerName"], "mycontainer");

        // A fresh process only knows the state file.
        let second = Program::declare(&config, first.engine.snapshot()).unwrap();
        let summary = second.engine.apply().await;
        assert!(!summary.has_changes());
        assert_eq!(second.provider.call_count(), 0);
        assert_eq!(second.ctx.resolve_exports().await.unwrap(), exports);
    }

    #[tokio::test]
    async fn test_renamed_container_replaced_from_state() {
        let mut config = ProgramConfig::demo();
        let first = Program::declare(&config, StateSnapshot::new()).unwrap();
        first.engine.apply().await;

        config.components[0].args["containerName"] = serde_json::json!("archive");
        let second = Program::declare(&config, first.engine.snapshot()).unwrap();
        let summary = second.engine.apply().await;

        assert!(summary.is_success(), "{:?}", summary.failures);
        assert_eq!(summary.count(StepOp::Replace), 1);
        assert_eq!(summary.count(StepOp::Same), 2);
        assert_eq!(second.components[0].state(), ComponentState::Ready);
        let exports = second.ctx.resolve_exports().await.unwrap();
        assert_eq!(exports["containerName"], "archive");

        let third = Program::declare(&config, second.engine.snapshot()).unwrap();
        assert!(!third.engine.apply().await.has_changes());
    }

    #[tokio::test]
    async fn test_destroy_removes_everything() {
        let config = ProgramConfig::demo();
        let program = Program::declare(&config, StateSnapshot::new()).unwrap();
        program.engine.apply().await;

        let destroy = Program::empty(&config, program.engine.snapshot());
        let summary = destroy.engine.apply().await;

        assert!(summary.is_success());
        assert_eq!(summary.count(StepOp::Delete), 4);
        assert_eq!(destroy.provider.resource_count(), 0);
        assert!(destroy.engine.snapshot().is_empty());
    }

    #[test]
    fn test_several_components_export_prefixed_keys() {
        let mut config = ProgramConfig::demo();
        let mut second = config.components[0].clone();
        second.name = "archive".to_string();
        config.components.push(second);

        let program = Program::declare(&config, StateSnapshot::new()).unwrap();
        let keys = program.ctx.export_keys();

        assert_eq!(keys.len(), 8);
        assert!(keys.contains(&"archive.containerName".to_string()));
        assert!(keys.contains(&"neovasilidemo.primaryBlobEndpoint".to_string()));
    }

    #[test]
    fn test_invalid_component_args() {
        let mut config = ProgramConfig::demo();
        config.components[0].args["sku"] = serde_json::json!("InvalidTier");

        let err = Program::declare(&config, StateSnapshot::new()).err().unwrap();
        assert!(err.to_string().contains("neovasilidemo"));
    }
}
