use stackarm_domain::VaultSpec;
use stackarm_driver::{ArmError, ResourceManager, SecretStoreFactory};
use tracing::info;

use crate::cleanup::CleanupGuard;
use crate::error::{SampleError, StepExt};
use crate::naming::{random_password, random_resource_name};
use crate::report::{SampleReport, Step};

/// Create a key vault, set and read back a secret, delete the vault.
#[derive(Clone)]
pub struct KeyVaultSecretSample {
    pub location:       String,
    pub tenant_id:      String,
    /// Object id granted every secret permission on the new vault.
    pub object_id:      String,
    pub resource_group: String,
    pub vault_name:     String,
    pub secret_name:    String,
    pub secret_value:   String,
}

impl std::fmt::Debug for KeyVaultSecretSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVaultSecretSample")
            .field("location", &self.location)
            .field("resource_group", &self.resource_group)
            .field("vault_name", &self.vault_name)
            .field("secret_name", &self.secret_name)
            .finish_non_exhaustive()
    }
}

impl KeyVaultSecretSample {
    pub const NAME: &'static str = "keyvault-secret";

    pub fn new(
        location: impl Into<String>,
        tenant_id: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Self {
        Self {
            location:       location.into(),
            tenant_id:      tenant_id.into(),
            object_id:      object_id.into(),
            resource_group: random_resource_name("rgkvs", 16),
            vault_name:     random_resource_name("kv", 8),
            secret_name:    random_resource_name("s", 8),
            secret_value:   random_password(),
        }
    }

    fn vault_spec(&self) -> VaultSpec {
        VaultSpec {
            name:                            self.vault_name.clone(),
            resource_group:                  self.resource_group.clone(),
            location:                        self.location.clone(),
            tenant_id:                       self.tenant_id.clone(),
            access_policy_object_id:         self.object_id.clone(),
            enabled_for_deployment:          true,
            enabled_for_template_deployment: true,
            sku:                             "standard".into(),
        }
    }

    pub async fn run(
        &self,
        manager: &dyn ResourceManager,
        secrets: &dyn SecretStoreFactory,
    ) -> Result<SampleReport, SampleError> {
        let mut report = SampleReport::new(Self::NAME);
        let mut guard = CleanupGuard::new(&self.resource_group);

        let result = self.steps(manager, secrets, &mut guard, &mut report).await;
        let cleanup = guard.release(manager).await;
        report.cleanup = Some(cleanup.clone());
        result.map(|()| report).map_err(|e| e.with_cleanup(cleanup))
    }

    async fn steps(
        &self,
        manager: &dyn ResourceManager,
        secrets: &dyn SecretStoreFactory,
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

        info!(name = %self.vault_name, "Creating a key vault");
        let vault = manager.create_vault(&self.vault_spec()).await.step("create key vault")?;
        info!(name = %vault.name, uri = %vault.vault_uri, "Created a key vault");
        report.steps.push(Step::VaultCreated {
            name:      vault.name.clone(),
            vault_uri: vault.vault_uri.clone(),
        });

        let store = secrets.for_vault(&vault).step("open secret store")?;

        info!(name = %self.secret_name, "Setting a secret");
        store
            .set_secret(&self.secret_name, &self.secret_value)
            .await
            .step("set secret")?;
        report.steps.push(Step::SecretSet { name: self.secret_name.clone() });

        info!(name = %self.secret_name, "Getting the secret");
        let secret = store.get_secret(&self.secret_name).await.step("get secret")?;
        if secret.value != self.secret_value {
            return Err(ArmError::OperationFailed(format!(
                "secret '{}' came back with a different value",
                self.secret_name
            )))
            .step("get secret");
        }
        report.steps.push(Step::SecretRetrieved { name: secret.name });

        info!(name = %vault.name, "Deleting key vault");
        manager.delete_vault(&vault.id).await.step("delete key vault")?;
        report.steps.push(Step::VaultDeleted { name: vault.name });

        Ok(())
    }
}
