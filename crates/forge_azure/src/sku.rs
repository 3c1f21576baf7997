//! Storage redundancy tiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ComponentError;

/// Storage account SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageSku {
    #[default]
    #[serde(rename = "Standard_LRS")]
    StandardLrs,
    #[serde(rename = "Standard_GRS")]
    StandardGrs,
    #[serde(rename = "Standard_RAGRS")]
    StandardRagrs,
    #[serde(rename = "Standard_ZRS")]
    StandardZrs,
    #[serde(rename = "Standard_GZRS")]
    StandardGzrs,
    #[serde(rename = "Standard_RAGZRS")]
    StandardRagzrs,
    #[serde(rename = "Premium_LRS")]
    PremiumLrs,
    #[serde(rename = "Premium_ZRS")]
    PremiumZrs,
}

impl StorageSku {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageSku::StandardLrs => "Standard_LRS",
            StorageSku::StandardGrs => "Standard_GRS",
            StorageSku::StandardRagrs => "Standard_RAGRS",
            StorageSku::StandardZrs => "Standard_ZRS",
            StorageSku::StandardGzrs => "Standard_GZRS",
            StorageSku::StandardRagzrs => "Standard_RAGZRS",
            StorageSku::PremiumLrs => "Premium_LRS",
            StorageSku::PremiumZrs => "Premium_ZRS",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            StorageSku::StandardLrs,
            StorageSku::StandardGrs,
            StorageSku::StandardRagrs,
            StorageSku::StandardZrs,
            StorageSku::StandardGzrs,
            StorageSku::StandardRagzrs,
            StorageSku::PremiumLrs,
            StorageSku::PremiumZrs,
        ]
    }
}

impl fmt::Display for StorageSku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StorageSku {
    type Err = ComponentError;

    /// Names are matched exactly, as Azure does.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageSku::all()
            .into_iter()
            .find(|sku| sku.as_str() == s)
            .ok_or_else(|| {
                ComponentError::invalid(format!(
                    "unsupported SKU '{}', expected one of: {}",
                    s,
                    StorageSku::all()
                        .iter()
                        .map(|sku| sku.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}
