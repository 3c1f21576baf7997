//! Validate command - Declare a program without provisioning it.

use anyhow::Result;
use clap::Args;
use forge_azure::ComponentHost;
use forge_engine::StateSnapshot;
use tracing::info;

use super::ProgramArgs;
use crate::program::Program;

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub program: ProgramArgs,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    let config = args.program.load()?;
    info!("Validating {} ({} stack)", config.project, config.stack);

    // Declaration runs every input check and registration without touching
    // the cloud.
    let program = Program::declare(&config, StateSnapshot::new())?;

    println!("📋 Declared resources:");
    for resource in program.engine.declared_resources() {
        let indent = if resource.parent.is_some() { "    " } else { "  " };
        println!("{}{} ({})", indent, resource.urn.name(), resource.type_token);
    }
    println!();
    println!("📦 Available components:");
    for schema in ComponentHost::default().schemas() {
        println!("  {} - {}", schema.type_token, schema.description);
    }
    println!();
    println!(
        "✅ Program is valid: {} components, {} exports",
        program.components.len(),
        program.ctx.export_keys().len()
    );
    Ok(())
}
