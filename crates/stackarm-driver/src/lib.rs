pub mod arm;
pub mod credential;
pub mod environment;
pub mod error;
pub mod local;
pub mod manager;
pub mod secrets;
pub mod session;

pub use arm::ArmResourceManager;
pub use credential::{ClientSecretCredential, StaticToken, TokenProvider};
pub use environment::{descriptor_from_metadata, metadata_url, EnvironmentResolver, DEFAULT_TIMEOUT};
pub use error::{ArmError, AuthConfigError, DiscoveryError};
pub use local::{LocalResourceManager, LocalSecretStore};
pub use manager::{ResourceManager, SecretStore, SecretStoreFactory};
pub use secrets::{VaultSecretClient, VaultSecretClientFactory};
pub use session::{bootstrap, bootstrap_with_client, Session};
