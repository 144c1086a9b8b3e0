use std::sync::Arc;

use async_trait::async_trait;
use stackarm_domain::{
    ResourceGroup, Secret, StorageAccount, StorageAccountKey, StorageAccountSpec, Tags, Vault,
    VaultSpec,
};

use crate::error::ArmError;

/// Resource-management operations the samples drive.
///
/// Implementations are thin: one logical call per method, no retries.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    fn name(&self) -> &'static str;

    // ── Resource groups ───────────────────────────────────────────────────────

    async fn create_resource_group(
        &self,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroup, ArmError>;

    /// Merge `tags` into the group's existing tags.
    async fn update_resource_group_tags(
        &self,
        group: &ResourceGroup,
        tags: &Tags,
    ) -> Result<ResourceGroup, ArmError>;

    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>, ArmError>;

    /// Start deleting a resource group and return without waiting for it.
    /// A group that does not exist yields [`ArmError::NotFound`].
    async fn begin_delete_resource_group(&self, name: &str) -> Result<(), ArmError>;

    // ── Storage accounts ──────────────────────────────────────────────────────

    async fn create_storage_account(
        &self,
        spec: &StorageAccountSpec,
    ) -> Result<StorageAccount, ArmError>;

    async fn list_storage_account_keys(
        &self,
        account: &StorageAccount,
    ) -> Result<Vec<StorageAccountKey>, ArmError>;

    /// Regenerate one key; returns the full key set afterwards.
    async fn regenerate_storage_account_key(
        &self,
        account: &StorageAccount,
        key_name: &str,
    ) -> Result<Vec<StorageAccountKey>, ArmError>;

    async fn list_storage_accounts_by_resource_group(
        &self,
        resource_group: &str,
    ) -> Result<Vec<StorageAccount>, ArmError>;

    async fn delete_storage_account(&self, id: &str) -> Result<(), ArmError>;

    // ── Key vaults ────────────────────────────────────────────────────────────

    async fn create_vault(&self, spec: &VaultSpec) -> Result<Vault, ArmError>;

    async fn delete_vault(&self, id: &str) -> Result<(), ArmError>;
}

/// Secret operations scoped to one vault.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn set_secret(&self, name: &str, value: &str) -> Result<Secret, ArmError>;

    async fn get_secret(&self, name: &str) -> Result<Secret, ArmError>;
}

/// Builds a [`SecretStore`] for a vault once its URI is known.
pub trait SecretStoreFactory: Send + Sync {
    fn for_vault(&self, vault: &Vault) -> Result<Arc<dyn SecretStore>, ArmError>;
}
