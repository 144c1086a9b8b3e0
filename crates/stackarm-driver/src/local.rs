use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use stackarm_domain::{
    ResourceGroup, Secret, StorageAccount, StorageAccountKey, StorageAccountSpec, Tags, Vault,
    VaultSpec,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::ArmError;
use crate::manager::{ResourceManager, SecretStore, SecretStoreFactory};

#[derive(Debug, Default)]
struct Inner {
    /// Keyed by lowercase name; ARM resource-group names are case-insensitive.
    groups:   BTreeMap<String, ResourceGroup>,
    accounts: BTreeMap<String, (StorageAccount, Vec<StorageAccountKey>)>,
    vaults:   BTreeMap<String, Vault>,
    /// (vault name, secret name) → secret.
    secrets:  HashMap<(String, String), Secret>,
    calls:    Vec<String>,
}

/// In-memory [`ResourceManager`] that simulates a subscription.
///
/// - Produces ARM-shaped ids for everything it creates.
/// - Deleting a group deletes the accounts and vaults inside it.
/// - Performs no network I/O. All data is lost on drop.
#[derive(Debug, Clone)]
pub struct LocalResourceManager {
    subscription_id: String,
    inner:           Arc<RwLock<Inner>>,
    fail_on:         Vec<&'static str>,
}

impl Default for LocalResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalResourceManager {
    pub fn new() -> Self {
        Self {
            subscription_id: "00000000-0000-0000-0000-000000000000".into(),
            inner:           Arc::new(RwLock::new(Inner::default())),
            fail_on:         Vec::new(),
        }
    }

    /// Make the named operation (e.g. `"create_storage_account"`) fail with a 500.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on.push(operation);
        self
    }

    /// Every operation invoked so far, in order, e.g. `"create_resource_group rg1"`.
    pub async fn calls(&self) -> Vec<String> {
        self.inner.read().await.calls.clone()
    }

    pub async fn resource_group_names(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        guard.groups.values().map(|g| g.name.clone()).collect()
    }

    pub async fn storage_account_count(&self) -> usize {
        self.inner.read().await.accounts.len()
    }

    pub async fn vault_count(&self) -> usize {
        self.inner.read().await.vaults.len()
    }

    async fn record(&self, operation: &'static str, target: &str) -> Result<(), ArmError> {
        debug!(operation, target, "LocalResourceManager");
        self.inner.write().await.calls.push(format!("{} {}", operation, target));
        if self.fail_on.contains(&operation) {
            return Err(ArmError::Status {
                method:  "LOCAL",
                url:     format!("local://{}/{}", operation, target),
                status:  500,
                message: "InternalServerError: injected failure".into(),
            });
        }
        Ok(())
    }

    fn not_found(kind: &str, name: &str) -> ArmError {
        ArmError::NotFound { method: "LOCAL", url: format!("local://{}/{}", kind, name) }
    }

    fn group_id(&self, name: &str) -> String {
        format!("/subscriptions/{}/resourceGroups/{}", self.subscription_id, name)
    }

    fn new_keys() -> Vec<StorageAccountKey> {
        ["key1", "key2"]
            .into_iter()
            .map(|name| StorageAccountKey {
                key_name:    name.to_string(),
                value:       Uuid::new_v4().simple().to_string(),
                permissions: "FULL".into(),
            })
            .collect()
    }
}

#[async_trait]
impl ResourceManager for LocalResourceManager {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn create_resource_group(&self, name: &str, location: &str) -> Result<ResourceGroup, ArmError> {
        self.record("create_resource_group", name).await?;
        let mut guard = self.inner.write().await;
        let group = guard
            .groups
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| ResourceGroup {
                id:                 self.group_id(name),
                name:               name.to_string(),
                location:           location.to_string(),
                tags:               Tags::new(),
                provisioning_state: Some("Succeeded".into()),
            });
        Ok(group.clone())
    }

    async fn update_resource_group_tags(
        &self,
        group: &ResourceGroup,
        tags: &Tags,
    ) -> Result<ResourceGroup, ArmError> {
        self.record("update_resource_group_tags", &group.name).await?;
        let mut guard = self.inner.write().await;
        let stored = guard
            .groups
            .get_mut(&group.name.to_ascii_lowercase())
            .ok_or_else(|| Self::not_found("resourceGroups", &group.name))?;
        stored.tags.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(stored.clone())
    }

    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>, ArmError> {
        self.record("list_resource_groups", "").await?;
        Ok(self.inner.read().await.groups.values().cloned().collect())
    }

    async fn begin_delete_resource_group(&self, name: &str) -> Result<(), ArmError> {
        self.record("begin_delete_resource_group", name).await?;
        let mut guard = self.inner.write().await;
        let group = guard
            .groups
            .remove(&name.to_ascii_lowercase())
            .ok_or_else(|| Self::not_found("resourceGroups", name))?;

        guard.accounts.retain(|_, (a, _)| !a.resource_group.eq_ignore_ascii_case(&group.name));
        let doomed: Vec<String> = guard
            .vaults
            .values()
            .filter(|v| v.resource_group.eq_ignore_ascii_case(&group.name))
            .map(|v| v.name.clone())
            .collect();
        guard.vaults.retain(|_, v| !v.resource_group.eq_ignore_ascii_case(&group.name));
        guard.secrets.retain(|(vault, _), _| !doomed.contains(vault));
        Ok(())
    }

    async fn create_storage_account(&self, spec: &StorageAccountSpec) -> Result<StorageAccount, ArmError> {
        self.record("create_storage_account", &spec.name).await?;
        let mut guard = self.inner.write().await;
        if !guard.groups.contains_key(&spec.resource_group.to_ascii_lowercase()) {
            return Err(Self::not_found("resourceGroups", &spec.resource_group));
        }
        let id = format!(
            "{}/providers/Microsoft.Storage/storageAccounts/{}",
            self.group_id(&spec.resource_group),
            spec.name
        );
        let account = StorageAccount {
            id:                 id.clone(),
            name:               spec.name.clone(),
            resource_group:     spec.resource_group.clone(),
            location:           spec.location.clone(),
            kind:               spec.kind.clone(),
            sku:                spec.sku.clone(),
            creation_time:      Some(Utc::now()),
            provisioning_state: Some("Succeeded".into()),
        };
        guard.accounts.insert(id, (account.clone(), Self::new_keys()));
        Ok(account)
    }

    async fn list_storage_account_keys(
        &self,
        account: &StorageAccount,
    ) -> Result<Vec<StorageAccountKey>, ArmError> {
        self.record("list_storage_account_keys", &account.name).await?;
        let guard = self.inner.read().await;
        guard
            .accounts
            .get(&account.id)
            .map(|(_, keys)| keys.clone())
            .ok_or_else(|| Self::not_found("storageAccounts", &account.name))
    }

    async fn regenerate_storage_account_key(
        &self,
        account: &StorageAccount,
        key_name: &str,
    ) -> Result<Vec<StorageAccountKey>, ArmError> {
        self.record("regenerate_storage_account_key", &account.name).await?;
        let mut guard = self.inner.write().await;
        let (_, keys) = guard
            .accounts
            .get_mut(&account.id)
            .ok_or_else(|| Self::not_found("storageAccounts", &account.name))?;
        let key = keys.iter_mut().find(|k| k.key_name == key_name).ok_or_else(|| ArmError::Status {
            method:  "LOCAL",
            url:     format!("local://storageAccounts/{}/regenerateKey", account.name),
            status:  400,
            message: format!("InvalidKeyName: no key named '{}'", key_name),
        })?;
        key.value = Uuid::new_v4().simple().to_string();
        Ok(keys.clone())
    }

    async fn list_storage_accounts_by_resource_group(
        &self,
        resource_group: &str,
    ) -> Result<Vec<StorageAccount>, ArmError> {
        self.record("list_storage_accounts_by_resource_group", resource_group).await?;
        let guard = self.inner.read().await;
        if !guard.groups.contains_key(&resource_group.to_ascii_lowercase()) {
            return Err(Self::not_found("resourceGroups", resource_group));
        }
        Ok(guard
            .accounts
            .values()
            .filter(|(a, _)| a.resource_group.eq_ignore_ascii_case(resource_group))
            .map(|(a, _)| a.clone())
            .collect())
    }

    async fn delete_storage_account(&self, id: &str) -> Result<(), ArmError> {
        self.record("delete_storage_account", id).await?;
        let mut guard = self.inner.write().await;
        guard
            .accounts
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found("storageAccounts", id))
    }

    async fn create_vault(&self, spec: &VaultSpec) -> Result<Vault, ArmError> {
        self.record("create_vault", &spec.name).await?;
        let mut guard = self.inner.write().await;
        if !guard.groups.contains_key(&spec.resource_group.to_ascii_lowercase()) {
            return Err(Self::not_found("resourceGroups", &spec.resource_group));
        }
        let id = format!(
            "{}/providers/Microsoft.KeyVault/vaults/{}",
            self.group_id(&spec.resource_group),
            spec.name
        );
        let vault = Vault {
            id:             id.clone(),
            name:           spec.name.clone(),
            resource_group: spec.resource_group.clone(),
            location:       spec.location.clone(),
            vault_uri:      format!("https://{}.vault.local/", spec.name),
            sku:            spec.sku.clone(),
        };
        guard.vaults.insert(id, vault.clone());
        Ok(vault)
    }

    async fn delete_vault(&self, id: &str) -> Result<(), ArmError> {
        self.record("delete_vault", id).await?;
        let mut guard = self.inner.write().await;
        let vault = guard.vaults.remove(id).ok_or_else(|| Self::not_found("vaults", id))?;
        guard.secrets.retain(|(v, _), _| *v != vault.name);
        Ok(())
    }
}

// ── Secrets ───────────────────────────────────────────────────────────────────

/// [`SecretStore`] over the vaults of a [`LocalResourceManager`].
pub struct LocalSecretStore {
    manager:    LocalResourceManager,
    vault_name: String,
}

impl LocalSecretStore {
    async fn ensure_vault(&self) -> Result<(), ArmError> {
        let guard = self.manager.inner.read().await;
        if guard.vaults.values().any(|v| v.name == self.vault_name) {
            Ok(())
        } else {
            Err(LocalResourceManager::not_found("vaults", &self.vault_name))
        }
    }
}

#[async_trait]
impl SecretStore for LocalSecretStore {
    async fn set_secret(&self, name: &str, value: &str) -> Result<Secret, ArmError> {
        self.manager.record("set_secret", name).await?;
        self.ensure_vault().await?;
        let secret = Secret {
            name:  name.to_string(),
            value: value.to_string(),
            id:    Some(format!("https://{}.vault.local/secrets/{}", self.vault_name, name)),
        };
        self.manager
            .inner
            .write()
            .await
            .secrets
            .insert((self.vault_name.clone(), name.to_string()), secret.clone());
        Ok(secret)
    }

    async fn get_secret(&self, name: &str) -> Result<Secret, ArmError> {
        self.manager.record("get_secret", name).await?;
        self.ensure_vault().await?;
        let guard = self.manager.inner.read().await;
        guard
            .secrets
            .get(&(self.vault_name.clone(), name.to_string()))
            .cloned()
            .ok_or_else(|| LocalResourceManager::not_found("secrets", name))
    }
}

impl SecretStoreFactory for LocalResourceManager {
    fn for_vault(&self, vault: &Vault) -> Result<Arc<dyn SecretStore>, ArmError> {
        Ok(Arc::new(LocalSecretStore {
            manager:    self.clone(),
            vault_name: vault.name.clone(),
        }))
    }
}
