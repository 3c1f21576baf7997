//! Resource URNs.
//!
//! A URN addresses a resource inside the declared graph:
//!
//! ```text
//! urn:forge:<stack>::<project>::<qualified type>::<name>
//! ```
//!
//! The qualified type is the chain of parent types joined with `$`, so the
//! same logical name under the same parent always yields the same URN.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

const PREFIX: &str = "urn:forge:";

/// Unique resource name within a stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Urn(String);

impl Urn {
    /// Build a URN for a resource, nesting its type under the parent's.
    pub fn new(
        stack: &str,
        project: &str,
        parent: Option<&Urn>,
        type_token: &str,
        name: &str,
    ) -> Self {
        let qualified_type = match parent {
            Some(parent) => format!("{}${}", parent.qualified_type(), type_token),
            None => type_token.to_string(),
        };
        Self(format!(
            "{PREFIX}{stack}::{project}::{qualified_type}::{name}"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parts(&self) -> Vec<&str> {
        self.0[PREFIX.len()..].splitn(4, "::").collect()
    }

    pub fn stack(&self) -> &str {
        self.parts()[0]
    }

    pub fn project(&self) -> &str {
        self.parts()[1]
    }

    /// Parent chain plus own type, e.g. `a:b:Parent$a:b:Child`.
    pub fn qualified_type(&self) -> &str {
        self.parts()[2]
    }

    /// The resource's own type token.
    pub fn type_token(&self) -> &str {
        let qualified = self.qualified_type();
        qualified.rsplit('$').next().unwrap_or(qualified)
    }

    /// Logical name.
    pub fn name(&self) -> &str {
        self.parts()[3]
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Urn {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s
            .strip_prefix(PREFIX)
            .map(|rest| {
                let parts: Vec<&str> = rest.splitn(4, "::").collect();
                parts.len() == 4 && parts.iter().all(|p| !p.is_empty())
            })
            .unwrap_or(false);

        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(EngineError::InvalidUrn(s.to_string()))
        }
    }
}

impl TryFrom<String> for Urn {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.0
    }
}

/// Check a `<package>:<module>:<type>` token.
pub fn validate_type_token(token: &str) -> Result<(), EngineError> {
    let parts: Vec<&str> = token.split(':').collect();
    let well_formed = parts.len() == 3
        && parts.iter().all(|p| {
            !p.is_empty() && !p.contains('$') && !p.contains(char::is_whitespace)
        });

    if well_formed {
        Ok(())
    } else {
        Err(EngineError::InvalidTypeToken(token.to_string()))
    }
}
