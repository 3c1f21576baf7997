//! Error types for the engine module.

use thiserror::Error;

use crate::urn::Urn;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised synchronously by the engine or its providers.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Duplicate resource URN: {0}")]
    DuplicateUrn(Urn),

    #[error("Unknown parent resource: {0}")]
    UnknownParent(Urn),

    #[error("Unknown resource: {0}")]
    UnknownResource(Urn),

    #[error("Invalid type token '{0}': expected <package>:<module>:<type>")]
    InvalidTypeToken(String),

    #[error("Invalid URN: {0}")]
    InvalidUrn(String),

    #[error("Provider error: {0}")]
    Provider(String),

    /// The provider cannot apply the change in place; the resource has to be
    /// deleted and created again.
    #[error("Replacement required: {0}")]
    ReplaceRequired(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors carried by pending values.
///
/// Outputs are shared between every consumer that subscribes to them, so
/// the error has to be cloneable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("{urn} failed: {message}")]
    Failed { urn: Urn, message: String },

    #[error("{urn} was skipped because {dependency} did not resolve")]
    DependencyFailed { urn: Urn, dependency: Urn },

    #[error("{0} was abandoned before it resolved")]
    Abandoned(Urn),

    #[error("{urn} has no output property '{property}'")]
    MissingProperty { urn: Urn, property: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OutputError {
    /// The resource whose output this is.
    pub fn urn(&self) -> Option<&Urn> {
        match self {
            OutputError::Failed { urn, .. }
            | OutputError::DependencyFailed { urn, .. }
            | OutputError::Abandoned(urn)
            | OutputError::MissingProperty { urn, .. } => Some(urn),
            OutputError::Serialization(_) => None,
        }
    }

    /// The resource the failure originated from.
    ///
    /// Dependency failures point at the resource that actually failed, not at
    /// the one that was skipped.
    pub fn origin(&self) -> Option<&Urn> {
        match self {
            OutputError::Failed { urn, .. } => Some(urn),
            OutputError::DependencyFailed { dependency, .. } => Some(dependency),
            OutputError::Abandoned(urn) => Some(urn),
            OutputError::MissingProperty { urn, .. } => Some(urn),
            OutputError::Serialization(_) => None,
        }
    }
}
