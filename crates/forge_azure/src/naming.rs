//! Naming rules and deterministic storage account names.
//!
//! Storage account names live in a single global namespace: 3-24 characters,
//! lowercase letters and digits only. The account name is derived from the
//! component's logical name as
//!
//! ```text
//! <slug: up to 16 lowercase alphanumerics of the logical name>
//! <8 hex chars of sha256(logical name)>
//! ```
//!
//! The hash suffix keeps distinct logical names apart even when their slugs
//! collide (`my-data` and `my_data`), and the whole derivation is a pure
//! function, so the same logical name yields the same account on every run.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{ComponentError, ComponentResult};

const ACCOUNT_SLUG_LEN: usize = 16;
const ACCOUNT_HASH_LEN: usize = 8;
const ACCOUNT_SLUG_FALLBACK: &str = "st";

static ACCOUNT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]{3,24}$").expect("valid regex"));

static CONTAINER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid regex"));

static RESOURCE_GROUP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w\-.()]+$").expect("valid regex"));

/// Containers Azure reserves for the account root and static websites.
const RESERVED_CONTAINERS: &[&str] = &["$root", "$web"];

/// Derive the storage account name for a logical component name.
pub fn derive_account_name(logical_name: &str) -> String {
    let mut slug: String = logical_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(ACCOUNT_SLUG_LEN)
        .collect();
    if slug.is_empty() {
        slug.push_str(ACCOUNT_SLUG_FALLBACK);
    }

    let digest = Sha256::digest(logical_name.as_bytes());
    let suffix = hex::encode(digest);

    format!("{}{}", slug, &suffix[..ACCOUNT_HASH_LEN])
}

pub fn is_valid_account_name(name: &str) -> bool {
    ACCOUNT_NAME.is_match(name)
}

/// Check a blob container name.
///
/// 3-63 characters of lowercase letters, digits and hyphens; starts and ends
/// with a letter or digit; no consecutive hyphens. `$root` and `$web` are
/// accepted as-is.
pub fn validate_container_name(name: &str) -> ComponentResult<()> {
    if name.is_empty() {
        return Err(ComponentError::invalid("containerName must not be empty"));
    }
    if RESERVED_CONTAINERS.contains(&name) {
        return Ok(());
    }
    if !(3..=63).contains(&name.len()) {
        return Err(ComponentError::invalid(format!(
            "containerName '{}' must be between 3 and 63 characters",
            name
        )));
    }
    if !CONTAINER_NAME.is_match(name) {
        return Err(ComponentError::invalid(format!(
            "containerName '{}' may only contain lowercase letters, digits and single hyphens, \
             and must start and end with a letter or digit",
            name
        )));
    }
    Ok(())
}

/// Check a resource group name: 1-90 characters of letters, digits,
/// underscores, hyphens, periods and parentheses, not ending with a period.
pub fn validate_resource_group_name(name: &str) -> ComponentResult<()> {
    if name.is_empty() {
        return Err(ComponentError::invalid("resourceGroupName must not be empty"));
    }
    if name.chars().count() > 90 {
        return Err(ComponentError::invalid(format!(
            "resourceGroupName '{}' is longer than 90 characters",
            name
        )));
    }
    if !RESOURCE_GROUP_NAME.is_match(name) || name.ends_with('.') {
        return Err(ComponentError::invalid(format!(
            "resourceGroupName '{}' contains invalid characters",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_name_is_deterministic() {
        assert_eq!(derive_account_name("neovasilidemo"), derive_account_name("neovasilidemo"));
    }

    #[test]
    fn test_account_name_avoids_collisions() {
        let names = ["data", "Data", "my-data", "my_data", "mydata", "a", "b"];
        let derived: std::collections::HashSet<_> =
            names.iter().map(|n| derive_account_name(n)).collect();
        assert_eq!(derived.len(), names.len());
    }

    #[test]
    fn test_account_name_satisfies_azure_rules() {
        let long = "a-very-long-logical-name-that-goes-well-beyond-the-limit";
        for name in ["neovasilidemo", "x", "---", "Ünïcode-Name", long] {
            let derived = derive_account_name(name);
            assert!(is_valid_account_name(&derived), "{} -> {}", name, derived);
        }
        assert!(derive_account_name("---").starts_with("st"));
        assert!(derive_account_name("neovasilidemo").starts_with("neovasilidemo"));
    }

    #[test]
    fn test_container_names() {
        assert!(validate_container_name("mycontainer").is_ok());
        assert!(validate_container_name("my-container-01").is_ok());
        assert!(validate_container_name("$web").is_ok());

        let bad_names = [
            "",
            "ab",
            "MyContainer",
            "my--container",
            "-leading",
            "trailing-",
            "under_score",
        ];
        for bad in bad_names {
            assert!(
                validate_container_name(bad).unwrap_err().is_invalid_argument(),
                "{} should be rejected",
                bad
            );
        }
        assert!(validate_container_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_resource_group_names() {
        assert!(validate_resource_group_name("demo-rg").is_ok());
        assert!(validate_resource_group_name("rg_(prod).eu").is_ok());
        assert!(validate_resource_group_name("").is_err());
        assert!(validate_resource_group_name("ends.").is_err());
        assert!(validate_resource_group_name("has space").is_err());
        assert!(validate_resource_group_name(&"r".repeat(91)).is_err());
    }
}
