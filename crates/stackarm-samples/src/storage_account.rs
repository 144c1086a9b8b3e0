use stackarm_domain::{StorageAccount, StorageAccountSpec};
use stackarm_driver::{ArmError, ResourceManager};
use tracing::info;

use crate::cleanup::CleanupGuard;
use crate::error::{SampleError, StepExt};
use crate::naming::random_resource_name;
use crate::report::{SampleReport, Step};

/// Create storage accounts, rotate a key, list and delete.
#[derive(Debug, Clone)]
pub struct StorageAccountSample {
    pub location:       String,
    pub resource_group: String,
    pub first:          String,
    pub second:         String,
}

impl StorageAccountSample {
    pub const NAME: &'static str = "storage-account";

    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location:       location.into(),
            resource_group: random_resource_name("rgSTMS", 8),
            first:          random_resource_name("sa", 8),
            second:         random_resource_name("sa2", 8),
        }
    }

    pub async fn run(&self, manager: &dyn ResourceManager) -> Result<SampleReport, SampleError> {
        let mut report = SampleReport::new(Self::NAME);
        let mut guard = CleanupGuard::new(&self.resource_group);

        let result = self.steps(manager, &mut guard, &mut report).await;
        let cleanup = guard.release(manager).await;
        report.cleanup = Some(cleanup.clone());
        result.map(|()| report).map_err(|e| e.with_cleanup(cleanup))
    }

    async fn steps(
        &self,
        manager: &dyn ResourceManager,
        guard: &mut CleanupGuard,
        report: &mut SampleReport,
    ) -> Result<(), SampleError> {
        manager
            .create_resource_group(&self.resource_group, &self.location)
            .await
            .step("create resource group")?;
        guard.mark_created();
        report.steps.push(Step::ResourceGroupCreated {
            name:     self.resource_group.clone(),
            location: self.location.clone(),
        });

        info!(name = %self.first, "Creating a storage account");
        let account = self.create_account(manager, &self.first, report).await?;

        info!(account = %account.name, "Getting storage account access keys");
        let keys = manager
            .list_storage_account_keys(&account)
            .await
            .step("list storage account keys")?;
        report.steps.push(Step::StorageKeysListed {
            account:   account.name.clone(),
            key_names: keys.iter().map(|k| k.key_name.clone()).collect(),
        });

        let first_key = keys
            .first()
            .map(|k| k.key_name.clone())
            .ok_or_else(|| ArmError::OperationFailed(format!("storage account '{}' has no keys", account.name)))
            .step("regenerate storage account key")?;
        info!(account = %account.name, key = %first_key, "Regenerating first storage account access key");
        manager
            .regenerate_storage_account_key(&account, &first_key)
            .await
            .step("regenerate storage account key")?;
        report.steps.push(Step::StorageKeyRegenerated {
            account:  account.name.clone(),
            key_name: first_key,
        });

        info!(name = %self.second, "Creating a 2nd storage account");
        self.create_account(manager, &self.second, report).await?;

        info!(resource_group = %self.resource_group, "Listing storage accounts");
        let accounts = manager
            .list_storage_accounts_by_resource_group(&self.resource_group)
            .await
            .step("list storage accounts")?;
        for a in &accounts {
            info!(
                name = %a.name,
                created = ?a.creation_time,
                state = a.provisioning_state.as_deref().unwrap_or("unknown"),
                "Storage account"
            );
        }
        report.steps.push(Step::StorageAccountsListed {
            resource_group: self.resource_group.clone(),
            names:          accounts.into_iter().map(|a| a.name).collect(),
        });

        info!(name = %account.name, "Deleting a storage account");
        manager
            .delete_storage_account(&account.id)
            .await
            .step("delete storage account")?;
        report.steps.push(Step::StorageAccountDeleted { name: account.name });

        Ok(())
    }

    async fn create_account(
        &self,
        manager: &dyn ResourceManager,
        name: &str,
        report: &mut SampleReport,
    ) -> Result<StorageAccount, SampleError> {
        let spec = StorageAccountSpec::general_purpose(name, &self.resource_group, &self.location);
        let account = manager
            .create_storage_account(&spec)
            .await
            .step("create storage account")?;
        report.steps.push(Step::StorageAccountCreated {
            name:    account.name.clone(),
            id:      account.id.clone(),
            created: account.creation_time.map(|t| t.to_rfc3339()),
        });
        Ok(account)
    }
}
