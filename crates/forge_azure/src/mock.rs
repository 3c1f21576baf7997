//! Simulated Azure provider for testing and demos.
//!
//! Implements [`Provisioner`] for resource groups, storage accounts and blob
//! containers without talking to Azure. It enforces the ordering rules the
//! real service does (a container needs its account, an account needs its
//! resource group, account names are globally unique) and captures every
//! call for verification.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use forge_engine::{EngineError, EngineResult, ProvisionedResource, Provisioner};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::naming::is_valid_account_name;
use crate::resources::{BLOB_CONTAINER_TYPE, RESOURCE_GROUP_TYPE, STORAGE_ACCOUNT_TYPE};

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub method: String,
    pub type_token: String,
    /// Logical name for creates, resource id otherwise.
    pub target: String,
}

/// Mock Azure provider.
#[derive(Clone)]
pub struct MockAzureProvider {
    subscription_id: Arc<RwLock<String>>,
    /// Existing resource groups by name.
    resource_groups: Arc<RwLock<HashSet<String>>>,
    /// Existing storage accounts: name -> id.
    accounts: Arc<RwLock<HashMap<String, String>>>,
    /// Every live resource: id -> type token.
    resources: Arc<RwLock<HashMap<String, String>>>,
    /// Resource types whose creates and updates fail, with the message.
    failures: Arc<RwLock<HashMap<String, String>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
}

impl Default for MockAzureProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAzureProvider {
    /// Create a new mock provider with a random subscription.
    pub fn new() -> Self {
        Self {
            subscription_id: Arc::new(RwLock::new(uuid::Uuid::new_v4().to_string())),
            resource_groups: Arc::new(RwLock::new(HashSet::new())),
            accounts: Arc::new(RwLock::new(HashMap::new())),
            resources: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_subscription(self, subscription_id: impl Into<String>) -> Self {
        *self.subscription_id.write() = subscription_id.into();
        self
    }

    /// Pretend a resource group already exists outside the program.
    pub fn with_existing_resource_group(self, name: impl Into<String>) -> Self {
        self.resource_groups.write().insert(name.into());
        self
    }

    /// Pretend a storage account name is already taken in the global namespace.
    pub fn with_taken_account_name(self, name: impl Into<String>) -> Self {
        self.accounts
            .write()
            .insert(name.into(), "/foreign/tenant".to_string());
        self
    }

    /// Fail every create or update of `type_token`.
    pub fn simulate_failure(
        self,
        type_token: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.failures.write().insert(type_token.into(), message.into());
        self
    }

    /// Seed a resource that was provisioned by an earlier run.
    pub fn with_existing_resource(self, type_token: &str, resource: &ProvisionedResource) -> Self {
        self.track(type_token, resource);
        self
    }

    pub fn subscription_id(&self) -> String {
        self.subscription_id.read().clone()
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get calls to a specific method.
    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    pub fn account_exists(&self, name: &str) -> bool {
        self.accounts.read().contains_key(name)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.read().len()
    }

    fn record_call(&self, method: &str, type_token: &str, target: &str) {
        self.captured_calls.write().push(CapturedCall {
            method: method.to_string(),
            type_token: type_token.to_string(),
            target: target.to_string(),
        });
    }

    fn check_failure(&self, type_token: &str) -> EngineResult<()> {
        if let Some(message) = self.failures.read().get(type_token) {
            return Err(EngineError::Provider(message.clone()));
        }
        Ok(())
    }

    fn required_str<'a>(inputs: &'a Map<String, Value>, key: &str) -> EngineResult<&'a str> {
        inputs
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::Provider(format!("missing required property '{}'", key)))
    }

    fn group_id(&self, group: &str) -> String {
        format!("/subscriptions/{}/resourceGroups/{}", self.subscription_id(), group)
    }

    fn account_id(&self, group: &str, account: &str) -> String {
        format!(
            "{}/providers/Microsoft.Storage/storageAccounts/{}",
            self.group_id(group),
            account
        )
    }

    fn resource_group(&self, inputs: &Map<String, Value>) -> EngineResult<ProvisionedResource> {
        let name = Self::required_str(inputs, "resourceGroupName")?;
        let location = Self::required_str(inputs, "location")?;

        Ok(ProvisionedResource::new(self.group_id(name))
            .with_output("name", name)
            .with_output("location", location)
            .with_output("provisioningState", "Succeeded"))
    }

    fn storage_account(&self, inputs: &Map<String, Value>) -> EngineResult<ProvisionedResource> {
        let name = Self::required_str(inputs, "accountName")?;
        let group = Self::required_str(inputs, "resourceGroupName")?;
        let location = Self::required_str(inputs, "location")?;

        if !is_valid_account_name(name) {
            return Err(EngineError::Provider(format!(
                "AccountNameInvalid: '{}' is not a valid storage account name",
                name
            )));
        }
        if !self.resource_groups.read().contains(group) {
            return Err(EngineError::Provider(format!(
                "ResourceGroupNotFound: resource group '{}' could not be found",
                group
            )));
        }

        let endpoint = |service: &str| format!("https://{}.{}.core.windows.net/", name, service);
        Ok(ProvisionedResource::new(self.account_id(group, name))
            .with_output("name", name)
            .with_output("primaryLocation", location)
            .with_output("statusOfPrimary", "available")
            .with_output("provisioningState", "Succeeded")
            .with_output(
                "primaryEndpoints",
                json!({
                    "blob": endpoint("blob"),
                    "dfs": endpoint("dfs"),
                    "file": endpoint("file"),
                    "queue": endpoint("queue"),
                    "table": endpoint("table"),
                    "web": format!("https://{}.z13.web.core.windows.net/", name),
                }),
            ))
    }

    fn blob_container(&self, inputs: &Map<String, Value>) -> EngineResult<ProvisionedResource> {
        let account = Self::required_str(inputs, "accountName")?;
        let container = Self::required_str(inputs, "containerName")?;

        let account_id = self.accounts.read().get(account).cloned().ok_or_else(|| {
            EngineError::Provider(format!(
                "ParentResourceNotFound: storage account '{}' does not exist",
                account
            ))
        })?;

        Ok(ProvisionedResource::new(format!(
            "{}/blobServices/default/containers/{}",
            account_id, container
        ))
        .with_output("name", container)
        .with_output("publicAccess", "None"))
    }

    fn provision(
        &self,
        type_token: &str,
        inputs: &Map<String, Value>,
    ) -> EngineResult<ProvisionedResource> {
        match type_token {
            RESOURCE_GROUP_TYPE => self.resource_group(inputs),
            STORAGE_ACCOUNT_TYPE => self.storage_account(inputs),
            BLOB_CONTAINER_TYPE => self.blob_container(inputs),
            other => Err(EngineError::Provider(format!(
                "unsupported resource type '{}'",
                other
            ))),
        }
    }

    fn track(&self, type_token: &str, provisioned: &ProvisionedResource) {
        match type_token {
            RESOURCE_GROUP_TYPE => {
                if let Some(name) = provisioned.outputs.get("name").and_then(Value::as_str) {
                    self.resource_groups.write().insert(name.to_string());
                }
            }
            STORAGE_ACCOUNT_TYPE => {
                if let Some(name) = provisioned.outputs.get("name").and_then(Value::as_str) {
                    self.accounts
                        .write()
                        .insert(name.to_string(), provisioned.id.clone());
                }
            }
            _ => {}
        }
        self.resources
            .write()
            .insert(provisioned.id.clone(), type_token.to_string());
    }
}

#[async_trait]
impl Provisioner for MockAzureProvider {
    async fn create(
        &self,
        type_token: &str,
        name: &str,
        inputs: &Map<String, Value>,
    ) -> EngineResult<ProvisionedResource> {
        self.record_call("create", type_token, name);
        self.check_failure(type_token)?;

        if type_token == STORAGE_ACCOUNT_TYPE {
            let account = Self::required_str(inputs, "accountName")?;
            if self.account_exists(account) {
                return Err(EngineError::Provider(format!(
                    "StorageAccountAlreadyTaken: the storage account named {} is already taken",
                    account
                )));
            }
        }

        let provisioned = self.provision(type_token, inputs)?;
        debug!("Mock created {}", provisioned.id);
        self.track(type_token, &provisioned);
        Ok(provisioned)
    }

    async fn update(
        &self,
        type_token: &str,
        id: &str,
        inputs: &Map<String, Value>,
    ) -> EngineResult<ProvisionedResource> {
        self.record_call("update", type_token, id);
        self.check_failure(type_token)?;

        if !self.resources.read().contains_key(id) {
            return Err(EngineError::Provider(format!("ResourceNotFound: {}", id)));
        }
        let provisioned = self.provision(type_token, inputs)?;
        if provisioned.id != id {
            return Err(EngineError::ReplaceRequired(format!(
                "{} would become {}",
                id, provisioned.id
            )));
        }
        Ok(provisioned)
    }

    async fn delete(&self, type_token: &str, id: &str) -> EngineResult<()> {
        self.record_call("delete", type_token, id);

        if self.resources.write().remove(id).is_none() {
            return Err(EngineError::Provider(format!("ResourceNotFound: {}", id)));
        }
        match type_token {
            STORAGE_ACCOUNT_TYPE => self
                .accounts
                .write()
                .retain(|_, account_id| account_id.as_str() != id),
            RESOURCE_GROUP_TYPE => {
                let name = id.rsplit('/').next().unwrap_or_default().to_string();
                self.resource_groups.write().remove(&name);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn account_inputs(name: &str) -> Map<String, Value> {
        inputs(json!({
            "accountName": name,
            "resourceGroupName": "demo-rg",
            "location": "eastus",
        }))
    }

    #[tokio::test]
    async fn test_account_requires_resource_group() {
        let provider = MockAzureProvider::new();
        let err = provider
            .create(STORAGE_ACCOUNT_TYPE, "sa", &account_inputs("acct1234"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ResourceGroupNotFound"));
    }

    #[tokio::test]
    async fn test_account_endpoints() {
        let provider = MockAzureProvider::new()
            .with_subscription("sub")
            .with_existing_resource_group("demo-rg");
        let created = provider
            .create(STORAGE_ACCOUNT_TYPE, "sa", &account_inputs("acct1234"))
            .await
            .unwrap();

        assert_eq!(
            created.id,
            "/subscriptions/sub/resourceGroups/demo-rg\
             /providers/Microsoft.Storage/storageAccounts/acct1234"
        );
        assert_eq!(
            created.outputs["primaryEndpoints"]["blob"],
            json!("https://acct1234.blob.core.windows.net/")
        );
    }

    #[tokio::test]
    async fn test_account_names_are_global() {
        let provider = MockAzureProvider::new()
            .with_existing_resource_group("demo-rg")
            .with_taken_account_name("acct1234");
        let err = provider
            .create(STORAGE_ACCOUNT_TYPE, "sa", &account_inputs("acct1234"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("AlreadyTaken"));
    }

    #[tokio::test]
    async fn test_container_requires_account() {
        let provider = MockAzureProvider::new();
        let err = provider
            .create(
                BLOB_CONTAINER_TYPE,
                "c",
                &inputs(json!({
                    "accountName": "missing",
                    "containerName": "data",
                    "resourceGroupName": "demo-rg",
                })),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ParentResourceNotFound"));
    }

    #[tokio::test]
    async fn test_simulated_failure_and_captured_calls() {
        let provider = MockAzureProvider::new()
            .with_existing_resource_group("demo-rg")
            .simulate_failure(STORAGE_ACCOUNT_TYPE, "quota exceeded");

        let err = provider
            .create(STORAGE_ACCOUNT_TYPE, "sa", &account_inputs("acct1234"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("quota exceeded"));
        let calls = provider.get_method_calls("create");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target, "sa");
        assert!(!provider.account_exists("acct1234"));
    }

    #[tokio::test]
    async fn test_delete_frees_account_name() {
        let provider = MockAzureProvider::new().with_existing_resource_group("demo-rg");
        let created = provider
            .create(STORAGE_ACCOUNT_TYPE, "sa", &account_inputs("acct1234"))
            .await
            .unwrap();

        provider.delete(STORAGE_ACCOUNT_TYPE, &created.id).await.unwrap();

        assert!(!provider.account_exists("acct1234"));
        assert_eq!(provider.resource_count(), 0);
    }

    #[tokio::test]
    async fn test_seeded_account_accepts_containers() {
        let account =
            ProvisionedResource::new("/subscriptions/sub/acct").with_output("name", "acct1234");
        let provider =
            MockAzureProvider::new().with_existing_resource(STORAGE_ACCOUNT_TYPE, &account);

        assert!(provider.account_exists("acct1234"));
        let created = provider
            .create(
                BLOB_CONTAINER_TYPE,
                "c",
                &inputs(json!({
                    "accountName": "acct1234",
                    "containerName": "data",
                    "resourceGroupName": "demo-rg",
                })),
            )
            .await
            .unwrap();
        assert_eq!(
            created.id,
            "/subscriptions/sub/acct/blobServices/default/containers/data"
        );
    }
}
