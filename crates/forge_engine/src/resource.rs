//! Resource declaration types shared by engines and components.

use std::collections::{BTreeMap, BTreeSet};

use futures::future;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::OutputError;
use crate::output::Output;
use crate::urn::Urn;

/// Options attached to a resource or component registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOptions {
    /// Owning resource in the graph.
    pub parent: Option<Urn>,
    /// Explicit dependencies in addition to the ones carried by inputs.
    pub depends_on: Vec<Urn>,
    /// Refuse to delete the resource.
    pub protect: bool,
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a child of `parent`.
    pub fn child_of(parent: &Urn) -> Self {
        Self {
            parent: Some(parent.clone()),
            ..Self::default()
        }
    }

    pub fn depends_on(mut self, urn: &Urn) -> Self {
        self.depends_on.push(urn.clone());
        self
    }

    pub fn protect(mut self, protect: bool) -> Self {
        self.protect = protect;
        self
    }

    /// Options a component hands to its children: parented to the component
    /// and inheriting its explicit dependencies and protection.
    pub fn inherit(&self, parent: &Urn) -> Self {
        Self {
            parent: Some(parent.clone()),
            depends_on: self.depends_on.clone(),
            protect: self.protect,
        }
    }
}

/// Provisioning status of a declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Declared, not yet picked up by the engine.
    Pending,
    /// The engine is waiting on inputs or talking to the provider.
    Provisioning,
    /// Provisioned, outputs resolved.
    Ready,
    /// Provisioning failed or a dependency failed.
    Failed,
}

impl ResourceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResourceStatus::Ready | ResourceStatus::Failed)
    }
}

/// Input or output properties of a resource, each possibly pending.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: BTreeMap<String, Output<Value>>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property to a known value.
    pub fn value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), Output::known(value.into()));
        self
    }

    /// Set a property to a possibly pending value.
    pub fn output<T>(mut self, key: impl Into<String>, output: &Output<T>) -> Self
    where
        T: Clone + Serialize + Send + Sync + 'static,
    {
        self.entries.insert(key.into(), output.to_value());
        self
    }

    /// Set a property only when a value is present.
    pub fn optional(self, key: impl Into<String>, value: Option<Value>) -> Self {
        match value {
            Some(value) => self.value(key, value),
            None => self,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, output: Output<Value>) {
        self.entries.insert(key.into(), output);
    }

    pub fn get(&self, key: &str) -> Option<&Output<Value>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Output<Value>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of the dependencies of every property.
    pub fn dependencies(&self) -> BTreeSet<Urn> {
        self.entries
            .values()
            .flat_map(|o| o.dependencies().iter().cloned())
            .collect()
    }

    /// Dependencies per property, omitting properties with none.
    pub fn property_dependencies(&self) -> BTreeMap<String, BTreeSet<Urn>> {
        self.entries
            .iter()
            .filter(|(_, o)| !o.dependencies().is_empty())
            .map(|(k, o)| (k.clone(), o.dependencies().clone()))
            .collect()
    }

    /// Wait for every property and collect them into a JSON object.
    pub async fn resolve_all(&self) -> Result<Map<String, Value>, OutputError> {
        let keys: Vec<String> = self.entries.keys().cloned().collect();
        let values =
            future::try_join_all(self.entries.values().map(|output| output.resolve())).await?;
        Ok(keys.into_iter().zip(values).collect())
    }
}

/// Handles returned when a custom resource is registered.
#[derive(Debug, Clone)]
pub struct RegisteredResource {
    pub urn: Urn,
    /// Provider-assigned identifier.
    pub id: Output<String>,
    /// Full resource state (inputs merged with provider outputs).
    pub state: Output<Map<String, Value>>,
}

impl RegisteredResource {
    /// A single state property.
    pub fn output(&self, property: &str) -> Output<Value> {
        let urn = self.urn.clone();
        let property = property.to_string();
        self.state.try_apply(move |state| {
            state
                .get(&property)
                .cloned()
                .ok_or(OutputError::MissingProperty { urn, property })
        })
    }

    /// A single string state property.
    pub fn string_output(&self, property: &str) -> Output<String> {
        let urn = self.urn.clone();
        let property = property.to_string();
        self.output(&property).try_apply(move |value| match value {
            Value::String(s) => Ok(s),
            _ => Err(OutputError::MissingProperty { urn, property }),
        })
    }

    /// A string nested under an object property, e.g. `primaryEndpoints.blob`.
    pub fn nested_string_output(&self, path: &[&str]) -> Output<String> {
        let urn = self.urn.clone();
        let path: Vec<String> = path.iter().map(|p| p.to_string()).collect();
        self.state.try_apply(move |state| {
            let mut current = state.get(&path[0]);
            for segment in &path[1..] {
                current = current.and_then(|value| value.get(segment));
            }
            match current {
                Some(Value::String(s)) => Ok(s.clone()),
                _ => Err(OutputError::MissingProperty {
                    urn,
                    property: path.join("."),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn urn(name: &str) -> Urn {
        Urn::new("test", "proj", None, "pkg:index:Thing", name)
    }

    #[tokio::test]
    async fn test_property_map_resolves_known_and_pending() {
        let (resolver, pending) = Output::<String>::pending(urn("account"));
        let props = PropertyMap::new()
            .value("containerName", "data")
            .output("accountName", &pending);

        assert_eq!(props.len(), 2);
        assert!(props.dependencies().contains(&urn("account")));
        assert_eq!(
            props.property_dependencies().keys().collect::<Vec<_>>(),
            vec!["accountName"]
        );

        resolver.resolve("acct".to_string());
        let resolved = props.resolve_all().await.unwrap();
        assert_eq!(resolved.get("accountName"), Some(&json!("acct")));
        assert_eq!(resolved.get("containerName"), Some(&json!("data")));
    }

    #[tokio::test]
    async fn test_registered_resource_outputs() {
        let (state_resolver, state) = Output::<Map<String, Value>>::pending(urn("sa"));
        let resource = RegisteredResource {
            urn: urn("sa"),
            id: Output::known("/id".to_string()),
            state,
        };
        let name = resource.string_output("name");
        let blob = resource.nested_string_output(&["primaryEndpoints", "blob"]);
        let missing = resource.string_output("nope");

        let json = json!({
            "name": "acct",
            "primaryEndpoints": { "blob": "https://acct.blob.core.windows.net/" }
        });
        state_resolver.resolve(json.as_object().cloned().unwrap());

        assert_eq!(name.resolve().await.unwrap(), "acct");
        assert_eq!(
            blob.resolve().await.unwrap(),
            "https://acct.blob.core.windows.net/"
        );
        assert!(matches!(
            missing.resolve().await,
            Err(OutputError::MissingProperty { .. })
        ));
    }

    #[test]
    fn test_inherit_options() {
        let parent = urn("component");
        let rg = urn("rg");
        let opts = ResourceOptions::new().depends_on(&rg).protect(true);
        let child = opts.inherit(&parent);

        assert_eq!(child.parent, Some(parent));
        assert_eq!(child.depends_on, vec![rg]);
        assert!(child.protect);
    }
}
