//! Destroy command - Delete every resource tracked for a stack.

use anyhow::{Context as _, Result};
use clap::Args;
use forge_engine::StepOp;
use tracing::info;

use super::ProgramArgs;
use crate::program::Program;

#[derive(Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub program: ProgramArgs,
}

pub async fn execute(args: DestroyArgs) -> Result<()> {
    let (config, state_path, prior) = args.program.load_with_state()?;

    if prior.is_empty() {
        println!("Nothing to destroy in stack {}", config.stack);
        return Ok(());
    }
    let components = prior.resources.iter().filter(|r| r.is_component()).count();
    info!(
        "Destroying {} resources and {} components in stack {}",
        prior.len() - components,
        components,
        config.stack
    );

    // Nothing declared: the engine deletes everything the state remembers.
    let program = Program::empty(&config, prior);
    let summary = program.engine.apply().await;

    program
        .engine
        .snapshot()
        .save(&state_path)
        .with_context(|| format!("Failed to save state to {}", state_path.display()))?;

    for step in &summary.steps {
        println!("  {:<6} {}", step.op.as_str(), step.urn.name());
    }

    if !summary.is_success() {
        for failure in &summary.failures {
            println!("  ❌ {}", failure);
        }
        anyhow::bail!(
            "Provisioning failed: {} resources could not be deleted",
            summary.failures.len()
        );
    }

    println!();
    println!("✅ Deleted {} resources", summary.count(StepOp::Delete));
    Ok(())
}
