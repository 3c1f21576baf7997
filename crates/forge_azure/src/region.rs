//! Azure region identifiers.

use crate::error::{ComponentError, ComponentResult};

/// Public Azure regions accepted as a storage account location.
pub const REGIONS: &[&str] = &[
    "australiacentral",
    "australiaeast",
    "australiasoutheast",
    "brazilsouth",
    "canadacentral",
    "canadaeast",
    "centralindia",
    "centralus",
    "eastasia",
    "eastus",
    "eastus2",
    "francecentral",
    "germanywestcentral",
    "israelcentral",
    "italynorth",
    "japaneast",
    "japanwest",
    "koreacentral",
    "koreasouth",
    "mexicocentral",
    "northcentralus",
    "northeurope",
    "norwayeast",
    "polandcentral",
    "qatarcentral",
    "southafricanorth",
    "southcentralus",
    "southeastasia",
    "southindia",
    "spaincentral",
    "swedencentral",
    "switzerlandnorth",
    "uaenorth",
    "uksouth",
    "ukwest",
    "westcentralus",
    "westeurope",
    "westindia",
    "westus",
    "westus2",
    "westus3",
];

/// Default region, as used by the demo program.
pub const DEFAULT_REGION: &str = "eastus";

/// Normalise a display name or identifier (`"East US 2"` -> `eastus2`).
pub fn normalize_region(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn is_known_region(location: &str) -> bool {
    REGIONS.contains(&location)
}

/// Normalise and check a location.
pub fn parse_region(location: &str) -> ComponentResult<String> {
    if location.trim().is_empty() {
        return Err(ComponentError::invalid("location must not be empty"));
    }
    let normalized = normalize_region(location);
    if is_known_region(&normalized) {
        Ok(normalized)
    } else {
        Err(ComponentError::invalid(format!(
            "unknown Azure region '{}'",
            location
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_display_names() {
        assert_eq!(normalize_region("East US"), "eastus");
        assert_eq!(normalize_region("West Europe"), "westeurope");
        assert_eq!(normalize_region("eastus2"), "eastus2");
    }

    #[test]
    fn test_parse_region() {
        assert_eq!(parse_region("East US 2").unwrap(), "eastus2");
        assert!(parse_region("").unwrap_err().is_invalid_argument());
        assert!(parse_region("moon-base-1").unwrap_err().is_invalid_argument());
    }
}
