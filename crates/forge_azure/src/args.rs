//! Input contract of `StorageAccountWithContainer`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ComponentError, ComponentResult};
use crate::naming::{validate_container_name, validate_resource_group_name};
use crate::region::parse_region;
use crate::sku::StorageSku;

/// Maximum number of tags Azure accepts on a resource.
pub const MAX_TAGS: usize = 50;
const MAX_TAG_KEY_LEN: usize = 512;
const MAX_TAG_VALUE_LEN: usize = 256;
const FORBIDDEN_TAG_KEY_CHARS: &[char] = &['<', '>', '%', '&', '\\', '?', '/'];

/// Arguments for a storage account with one blob container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountWithContainerArgs {
    /// Resource group the storage account is created in.
    pub resource_group_name: String,
    /// Azure location of the storage account.
    pub location: String,
    /// Name of the blob container to create.
    pub container_name: String,
    /// Redundancy tier; `Standard_LRS` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Tags applied verbatim to the storage account.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl StorageAccountWithContainerArgs {
    pub fn new(
        resource_group_name: impl Into<String>,
        location: impl Into<String>,
        container_name: impl Into<String>,
    ) -> Self {
        Self {
            resource_group_name: resource_group_name.into(),
            location: location.into(),
            container_name: container_name.into(),
            sku: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Check and normalise the arguments. Pure: touches no engine.
    pub fn validate(&self) -> ComponentResult<ValidatedArgs> {
        validate_resource_group_name(&self.resource_group_name)?;
        let location = parse_region(&self.location)?;
        validate_container_name(&self.container_name)?;

        let sku = match &self.sku {
            Some(sku) => sku.parse()?,
            None => StorageSku::default(),
        };

        validate_tags(&self.tags)?;

        Ok(ValidatedArgs {
            resource_group_name: self.resource_group_name.clone(),
            location,
            container_name: self.container_name.clone(),
            sku,
            tags: self.tags.clone(),
        })
    }
}

/// Arguments that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedArgs {
    pub resource_group_name: String,
    /// Normalised region identifier.
    pub location: String,
    pub container_name: String,
    pub sku: StorageSku,
    pub tags: BTreeMap<String, String>,
}

fn validate_tags(tags: &BTreeMap<String, String>) -> ComponentResult<()> {
    if tags.len() > MAX_TAGS {
        return Err(ComponentError::invalid(format!(
            "at most {} tags are allowed, got {}",
            MAX_TAGS,
            tags.len()
        )));
    }
    let mut seen = HashSet::new();
    for (key, value) in tags {
        // Azure treats tag names case-insensitively.
        if !seen.insert(key.to_lowercase()) {
            return Err(ComponentError::invalid(format!(
                "tag key '{}' differs from another key only by case",
                key
            )));
        }
        if key.is_empty() || key.chars().count() > MAX_TAG_KEY_LEN {
            return Err(ComponentError::invalid(format!(
                "tag key '{}' must be 1-{} characters",
                key, MAX_TAG_KEY_LEN
            )));
        }
        if key.contains(FORBIDDEN_TAG_KEY_CHARS) {
            return Err(ComponentError::invalid(format!(
                "tag key '{}' contains a forbidden character",
                key
            )));
        }
        if value.chars().count() > MAX_TAG_VALUE_LEN {
            return Err(ComponentError::invalid(format!(
                "tag '{}' value is longer than {} characters",
                key, MAX_TAG_VALUE_LEN
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_args() -> StorageAccountWithContainerArgs {
        StorageAccountWithContainerArgs::new("demo-rg", "eastus", "mycontainer")
            .with_sku("Standard_LRS")
            .with_tag("environment", "demo")
    }

    #[test]
    fn test_valid_args() {
        let validated = demo_args().validate().unwrap();
        assert_eq!(validated.sku, StorageSku::StandardLrs);
        assert_eq!(validated.location, "eastus");
        assert_eq!(validated.tags.get("environment").map(String::as_str), Some("demo"));
    }

    #[test]
    fn test_sku_defaults_to_standard_lrs() {
        let args = StorageAccountWithContainerArgs::new("demo-rg", "East US", "mycontainer");
        let validated = args.validate().unwrap();
        assert_eq!(validated.sku, StorageSku::StandardLrs);
        assert_eq!(validated.location, "eastus");
    }

    #[test]
    fn test_empty_fields_rejected() {
        let mut args = demo_args();
        args.resource_group_name.clear();
        assert!(args.validate().unwrap_err().is_invalid_argument());

        let mut args = demo_args();
        args.location.clear();
        assert!(args.validate().unwrap_err().is_invalid_argument());

        let mut args = demo_args();
        args.container_name.clear();
        assert!(args.validate().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_invalid_sku_rejected() {
        let err = demo_args().with_sku("InvalidTier").validate().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_tag_rules() {
        assert!(demo_args().with_tag("a/b", "x").validate().is_err());
        assert!(demo_args().with_tag("k", "v".repeat(257)).validate().is_err());

        let mut args = demo_args();
        for i in 0..MAX_TAGS {
            args = args.with_tag(format!("t{}", i), "v");
        }
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_tag_keys_differing_only_by_case() {
        let err = demo_args()
            .with_tag("Env", "prod")
            .with_tag("env", "dev")
            .validate()
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("only by case"));

        assert!(demo_args().with_tag("Env", "prod").validate().is_ok());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let args: StorageAccountWithContainerArgs = serde_json::from_value(serde_json::json!({
            "resourceGroupName": "demo-rg",
            "location": "eastus",
            "containerName": "mycontainer",
            "tags": { "environment": "demo" }
        }))
        .unwrap();
        assert_eq!(args.sku, None);
        assert_eq!(args.tags.len(), 1);
    }
}
