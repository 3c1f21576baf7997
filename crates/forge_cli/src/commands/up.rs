//! Up command - Provision a program.

use anyhow::{Context as _, Result};
use clap::Args;
use forge_azure::{Component, ComponentError, ComponentState};
use tracing::info;

use super::ProgramArgs;
use crate::program::Program;

#[derive(Args)]
pub struct UpArgs {
    #[command(flatten)]
    pub program: ProgramArgs,

    /// Print exports as compact JSON
    #[arg(long)]
    compact: bool,
}

pub async fn execute(args: UpArgs) -> Result<()> {
    let (config, state_path, prior) = args.program.load_with_state()?;
    info!(
        "Provisioning {} ({} stack, {} tracked resources)",
        config.project,
        config.stack,
        prior.len()
    );

    let program = Program::declare(&config, prior)?;
    let summary = program.engine.apply().await;

    program
        .engine
        .snapshot()
        .save(&state_path)
        .with_context(|| format!("Failed to save state to {}", state_path.display()))?;

    for step in &summary.steps {
        println!("  {:<7} {}", step.op.as_str(), step.urn.name());
    }
    for failure in &summary.failures {
        println!("  ❌ {}", failure);
    }

    if !summary.is_success() {
        for component in &program.components {
            if component.state() == ComponentState::Failed {
                if let Some(err) = failed_component_error(component.as_ref()).await {
                    return Err(err.into());
                }
            }
        }
        anyhow::bail!(
            "Provisioning failed: {} of {} resources failed",
            summary.failures.len(),
            summary.steps.len() + summary.failures.len()
        );
    }

    let exports = program.ctx.resolve_exports().await?;
    let rendered = if args.compact {
        serde_json::to_string(&exports)?
    } else {
        serde_json::to_string_pretty(&exports)?
    };

    println!();
    println!("✅ {} resources up to date", summary.steps.len());
    println!("{}", rendered);
    Ok(())
}

/// The error a failed component reports for its outputs.
async fn failed_component_error(component: &dyn Component) -> Option<ComponentError> {
    for (_, output) in component.outputs().iter() {
        if let Err(err) = output.resolve().await {
            let child = err.urn().unwrap_or(component.urn()).clone();
            return Some(ComponentError::child(component.name(), &child, err));
        }
    }
    None
}
