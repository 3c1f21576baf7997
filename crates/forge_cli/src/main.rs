//! Forge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Engine registration failure
//! - 4: Provisioning failure

use std::process::ExitCode;

use clap::Parser;
use forge_azure::ComponentError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod program;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const REGISTRATION_FAILURE: u8 = 3;
    pub const PROVISIONING_FAILURE: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "forge=debug,warn" } else { "forge=info,warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Up(args) => commands::up::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Destroy(args) => commands::destroy::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let component_error = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<ComponentError>());

    match component_error {
        Some(ComponentError::InvalidArgument(_))
        | Some(ComponentError::UnknownComponentType(_)) => ExitCodes::INVALID_ARGS,
        Some(ComponentError::EngineRegistration { .. }) => ExitCodes::REGISTRATION_FAILURE,
        Some(ComponentError::ChildProvisioning { .. }) => ExitCodes::PROVISIONING_FAILURE,
        None => {
            let msg = e.to_string().to_lowercase();
            if msg.contains("provisioning") {
                ExitCodes::PROVISIONING_FAILURE
            } else if msg.contains("program file") || msg.contains("argument") {
                ExitCodes::INVALID_ARGS
            } else {
                ExitCodes::GENERAL_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;

    fn wrapped(err: ComponentError) -> anyhow::Error {
        Err::<(), _>(err)
            .context("Failed to declare component demo")
            .unwrap_err()
    }

    #[test]
    fn test_exit_codes_for_component_errors() {
        assert_eq!(
            categorize_error(&wrapped(ComponentError::InvalidArgument("sku".into()))),
            ExitCodes::INVALID_ARGS
        );
        assert_eq!(
            categorize_error(&wrapped(ComponentError::ChildProvisioning {
                component: "demo".into(),
                child: "demo-sa".into(),
                message: "quota".into(),
            })),
            ExitCodes::PROVISIONING_FAILURE
        );
    }

    #[test]
    fn test_exit_codes_from_messages() {
        assert_eq!(
            categorize_error(&anyhow::anyhow!("Provisioning failed: 1 of 3 resources failed")),
            ExitCodes::PROVISIONING_FAILURE
        );
        assert_eq!(
            categorize_error(&anyhow::anyhow!("Failed to read program file x.yaml")),
            ExitCodes::INVALID_ARGS
        );
        assert_eq!(
            categorize_error(&anyhow::anyhow!("disk full")),
            ExitCodes::GENERAL_ERROR
        );
    }
}
