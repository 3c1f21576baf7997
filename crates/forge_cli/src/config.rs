//! Program configuration.
//!
//! A program file names the project and stack, the resource group that
//! everything lives in and the component instances to declare:
//!
//! ```yaml
//! project: demo
//! stack: dev
//! resourceGroup:
//!   name: demo-rg
//!   location: eastus
//! components:
//!   - name: neovasilidemo
//!     type: forge-components:index:StorageAccountWithContainer
//!     args:
//!       containerName: mycontainer
//!       sku: Standard_LRS
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use forge_azure::region::DEFAULT_REGION;
use forge_azure::STORAGE_ACCOUNT_WITH_CONTAINER_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Directory state files are kept in, relative to the working directory.
pub const STATE_DIR: &str = ".forge";

/// Resource group declared by the program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupConfig {
    pub name: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// One component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_token: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

fn empty_args() -> Value {
    Value::Object(Default::default())
}

/// A complete program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramConfig {
    pub project: String,
    #[serde(default = "default_stack")]
    pub stack: String,
    pub resource_group: ResourceGroupConfig,
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

fn default_stack() -> String {
    "dev".to_string()
}

impl ProgramConfig {
    /// The demo program: one storage account with a container in `demo-rg`.
    pub fn demo() -> Self {
        Self {
            project: "demo".to_string(),
            stack: default_stack(),
            resource_group: ResourceGroupConfig {
                name: "demo-rg".to_string(),
                location: DEFAULT_REGION.to_string(),
                tags: BTreeMap::new(),
            },
            components: vec![ComponentConfig {
                name: "neovasilidemo".to_string(),
                type_token: STORAGE_ACCOUNT_WITH_CONTAINER_TYPE.to_string(),
                args: json!({
                    "containerName": "mycontainer",
                    "sku": "Standard_LRS",
                    "tags": {
                        "environment": "demo",
                        "purpose": "example",
                    },
                }),
            }],
        }
    }

    /// Load a program from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read program file {}", path.display()))?;
        let config: ProgramConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid program file {}", path.display()))?;
        Ok(config)
    }

    /// Save the program to a YAML file.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Load `path`, or fall back to the demo program.
    pub fn load_or_demo(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::demo()),
        }
    }

    /// Default state file for the program's stack.
    pub fn state_path(&self) -> PathBuf {
        Path::new(STATE_DIR).join(format!("{}.json", self.stack))
    }

    /// Component args with the program's resource group filled in where the
    /// component does not set its own.
    pub fn component_args(&self, component: &ComponentConfig) -> Value {
        let mut args = component.args.clone();
        if let Value::Object(map) = &mut args {
            map.entry("resourceGroupName")
                .or_insert_with(|| Value::String(self.resource_group.name.clone()));
            map.entry("location")
                .or_insert_with(|| Value::String(self.resource_group.location.clone()));
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_demo_program() {
        let demo = ProgramConfig::demo();
        assert_eq!(demo.stack, "dev");
        assert_eq!(demo.components.len(), 1);
        assert_eq!(demo.state_path(), Path::new(".forge").join("dev.json"));

        let args = demo.component_args(&demo.components[0]);
        assert_eq!(args["resourceGroupName"], json!("demo-rg"));
        assert_eq!(args["location"], json!("eastus"));
        assert_eq!(args["containerName"], json!("mycontainer"));
    }

    #[test]
    fn test_component_args_keep_explicit_values() {
        let demo = ProgramConfig::demo();
        let component = ComponentConfig {
            name: "other".to_string(),
            type_token: STORAGE_ACCOUNT_WITH_CONTAINER_TYPE.to_string(),
            args: json!({ "containerName": "data", "location": "westeurope" }),
        };

        let args = demo.component_args(&component);
        assert_eq!(args["location"], json!("westeurope"));
        assert_eq!(args["resourceGroupName"], json!("demo-rg"));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
project: shop
resourceGroup:
  name: shop-rg
  location: West Europe
components:
  - name: assets
    type: forge-components:index:StorageAccountWithContainer
    args:
      containerName: images
"#;
        let config: ProgramConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.project, "shop");
        assert_eq!(config.stack, "dev");
        assert_eq!(config.resource_group.location, "West Europe");
        assert_eq!(config.components[0].type_token, STORAGE_ACCOUNT_WITH_CONTAINER_TYPE);
        assert_eq!(config.components[0].args["containerName"], json!("images"));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forge.yaml");

        ProgramConfig::demo().to_file(&path).unwrap();
        let loaded = ProgramConfig::load_or_demo(Some(&path)).unwrap();

        assert_eq!(loaded, ProgramConfig::demo());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = ProgramConfig::from_file(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read program file"));
    }
}
