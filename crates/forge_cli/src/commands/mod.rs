//! CLI command definitions.
//!
//! Each subcommand loads a program (a YAML file, or the built-in demo) and
//! runs it against the local engine with a simulated Azure backend.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use forge_engine::StateSnapshot;

use crate::config::ProgramConfig;

pub mod destroy;
pub mod up;
pub mod validate;

/// Forge - declarative composite resources
#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "Forge - declare and provision composite cloud resources")]
#[command(long_about = r#"
Forge declares composite resources (such as a storage account with a blob
container) and provisions them through a local engine against a simulated
Azure backend.

COMMANDS:
  up        → Provision the program and print its exports
  validate  → Declare the program without provisioning anything
  destroy   → Delete everything recorded in the stack's state

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Engine registration failure
  4 - Provisioning failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision the program
    Up(up::UpArgs),

    /// Check the program without provisioning it
    Validate(validate::ValidateArgs),

    /// Delete every resource of the stack
    Destroy(destroy::DestroyArgs),
}

/// Where the program and its state come from.
#[derive(Args, Debug, Clone, Default)]
pub struct ProgramArgs {
    /// Program file (YAML); the demo program is used when omitted
    #[arg(short, long, env = "FORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// State file; defaults to .forge/<stack>.json
    #[arg(short, long, env = "FORGE_STATE")]
    pub state: Option<PathBuf>,

    /// Stack name, overriding the program file
    #[arg(long)]
    pub stack: Option<String>,
}

impl ProgramArgs {
    /// Load the program with overrides applied.
    pub fn load(&self) -> Result<ProgramConfig> {
        let mut config = ProgramConfig::load_or_demo(self.config.as_deref())?;
        if let Some(stack) = &self.stack {
            config.stack = stack.clone();
        }
        Ok(config)
    }

    pub fn state_path(&self, config: &ProgramConfig) -> PathBuf {
        self.state.clone().unwrap_or_else(|| config.state_path())
    }

    /// Load the program and the state it was last applied with.
    pub fn load_with_state(&self) -> Result<(ProgramConfig, PathBuf, StateSnapshot)> {
        let config = self.load()?;
        let state_path = self.state_path(&config);
        let state = StateSnapshot::load(&state_path)?;
        Ok((config, state_path, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_override() {
        let args = ProgramArgs {
            stack: Some("prod".to_string()),
            ..Default::default()
        };
        let config = args.load().unwrap();

        assert_eq!(config.stack, "prod");
        assert_eq!(args.state_path(&config), PathBuf::from(".forge/prod.json"));
    }

    #[test]
    fn test_explicit_state_path() {
        let args = ProgramArgs {
            state: Some(PathBuf::from("/tmp/state.json")),
            ..Default::default()
        };
        let config = args.load().unwrap();
        assert_eq!(args.state_path(&config), PathBuf::from("/tmp/state.json"));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["forge", "up", "--stack", "qa"]).unwrap();
        match cli.command {
            Commands::Up(args) => assert_eq!(args.program.stack.as_deref(), Some("qa")),
            _ => panic!("expected up"),
        }
    }
}
