use serde::Serialize;

/// One completed sample step, as shown to the user.
///
/// Secret values and storage keys never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Step {
    ResourceGroupCreated { name: String, location: String },
    ResourceGroupTagged { name: String, tag: String, value: String },
    ResourceGroupsListed { names: Vec<String> },
    ResourceGroupDeleteStarted { name: String },
    StorageAccountCreated { name: String, id: String, created: Option<String> },
    StorageKeysListed { account: String, key_names: Vec<String> },
    StorageKeyRegenerated { account: String, key_name: String },
    StorageAccountsListed { resource_group: String, names: Vec<String> },
    StorageAccountDeleted { name: String },
    VaultCreated { name: String, vault_uri: String },
    SecretSet { name: String },
    SecretRetrieved { name: String },
    VaultDeleted { name: String },
}

/// What happened when the primary resource group was released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// Nothing was created, so there was nothing to delete.
    Skipped,
    Deleted,
    /// The group was already gone.
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleReport {
    pub sample: &'static str,
    pub steps: Vec<Step>,
    pub cleanup: Option<CleanupOutcome>,
}

impl SampleReport {
    pub fn new(sample: &'static str) -> Self {
        Self {
            sample,
            steps: Vec::new(),
            cleanup: None,
        }
    }
}
