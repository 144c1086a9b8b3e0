pub mod cleanup;
pub mod error;
pub mod keyvault_secret;
pub mod naming;
pub mod report;
pub mod resource_group;
pub mod storage_account;

pub use cleanup::CleanupGuard;
pub use error::{SampleError, StepExt};
pub use keyvault_secret::KeyVaultSecretSample;
pub use report::{CleanupOutcome, SampleReport, Step};
pub use resource_group::ResourceGroupSample;
pub use storage_account::StorageAccountSample;
