//! Error types for Azure components.

use forge_engine::{EngineError, OutputError, Urn};
use thiserror::Error;

/// Result type alias for component operations.
pub type ComponentResult<T> = Result<T, ComponentError>;

/// Errors that can occur while declaring or resolving a component.
#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Engine registration failed for {name}: {source}")]
    EngineRegistration {
        name: String,
        #[source]
        source: EngineError,
    },

    #[error("Child provisioning failed for {component} ({child}): {message}")]
    ChildProvisioning {
        component: String,
        child: String,
        message: String,
    },

    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),
}

impl ComponentError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn registration(name: &str, source: EngineError) -> Self {
        Self::EngineRegistration {
            name: name.to_string(),
            source,
        }
    }

    /// Attribute an output failure to one of the component's own children.
    /// The message keeps the underlying cause, which may be a resource the
    /// component only depends on.
    pub fn child(component: &str, child: &Urn, error: OutputError) -> Self {
        Self::ChildProvisioning {
            component: component.to_string(),
            child: child.name().to_string(),
            message: error.to_string(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ComponentError::InvalidArgument(_))
    }
}
