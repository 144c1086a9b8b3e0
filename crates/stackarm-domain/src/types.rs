use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

// ── Identifiers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(s: impl Into<String>) -> Self {
        SubscriptionId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Environment descriptor ───────────────────────────────────────────────────

pub const MANAGEMENT_ENDPOINT_URL: &str = "managementEndpointUrl";
pub const RESOURCE_MANAGER_ENDPOINT_URL: &str = "resourceManagerEndpointUrl";
pub const GALLERY_ENDPOINT_URL: &str = "galleryEndpointUrl";
pub const ACTIVE_DIRECTORY_ENDPOINT_URL: &str = "activeDirectoryEndpointUrl";
pub const ACTIVE_DIRECTORY_RESOURCE_ID: &str = "activeDirectoryResourceId";
pub const ACTIVE_DIRECTORY_GRAPH_RESOURCE_ID: &str = "activeDirectoryGraphResourceId";
pub const STORAGE_ENDPOINT_SUFFIX: &str = "storageEndpointSuffix";
pub const KEY_VAULT_DNS_SUFFIX: &str = "keyVaultDnsSuffix";

/// Endpoint topology of one cloud instance, discovered at runtime.
///
/// Serialises with the camelCase key names used by the cloud's own
/// environment configuration, so the JSON form can be fed back to tooling
/// that expects that mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDescriptor {
    pub management_endpoint_url: String,
    pub resource_manager_endpoint_url: String,
    pub gallery_endpoint_url: String,
    pub active_directory_endpoint_url: String,
    pub active_directory_resource_id: String,
    pub active_directory_graph_resource_id: String,
    /// Always starts with `.`.
    pub storage_endpoint_suffix: String,
    /// Always starts with `.`.
    pub key_vault_dns_suffix: String,
}

impl EnvironmentDescriptor {
    /// Build a descriptor from `(key, value)` pairs.
    ///
    /// Every one of the eight keys must be present with a non-empty value.
    /// Unknown keys are rejected so a typo cannot silently drop an endpoint.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for (k, v) in entries {
            let key = k.as_ref();
            if !Self::KEYS.contains(&key) {
                return Err(DomainError::UnknownEndpointKey(key.to_string()));
            }
            map.insert(key.to_string(), v.into());
        }

        let mut take = |key: &'static str| -> Result<String, DomainError> {
            match map.remove(key) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(DomainError::MissingEndpoint(key)),
            }
        };

        let descriptor = Self {
            management_endpoint_url:            take(MANAGEMENT_ENDPOINT_URL)?,
            resource_manager_endpoint_url:      take(RESOURCE_MANAGER_ENDPOINT_URL)?,
            gallery_endpoint_url:               take(GALLERY_ENDPOINT_URL)?,
            active_directory_endpoint_url:      take(ACTIVE_DIRECTORY_ENDPOINT_URL)?,
            active_directory_resource_id:       take(ACTIVE_DIRECTORY_RESOURCE_ID)?,
            active_directory_graph_resource_id: take(ACTIVE_DIRECTORY_GRAPH_RESOURCE_ID)?,
            storage_endpoint_suffix:            take(STORAGE_ENDPOINT_SUFFIX)?,
            key_vault_dns_suffix:               take(KEY_VAULT_DNS_SUFFIX)?,
        };

        for (key, suffix) in [
            (STORAGE_ENDPOINT_SUFFIX, &descriptor.storage_endpoint_suffix),
            (KEY_VAULT_DNS_SUFFIX, &descriptor.key_vault_dns_suffix),
        ] {
            if !suffix.starts_with('.') {
                return Err(DomainError::InvalidSuffix { key, value: suffix.clone() });
            }
        }

        Ok(descriptor)
    }

    pub const KEYS: [&'static str; 8] = [
        MANAGEMENT_ENDPOINT_URL,
        RESOURCE_MANAGER_ENDPOINT_URL,
        GALLERY_ENDPOINT_URL,
        ACTIVE_DIRECTORY_ENDPOINT_URL,
        ACTIVE_DIRECTORY_RESOURCE_ID,
        ACTIVE_DIRECTORY_GRAPH_RESOURCE_ID,
        STORAGE_ENDPOINT_SUFFIX,
        KEY_VAULT_DNS_SUFFIX,
    ];

    /// The descriptor as an ordered list of `(key, value)` pairs.
    pub fn entries(&self) -> [(&'static str, &str); 8] {
        [
            (MANAGEMENT_ENDPOINT_URL, &self.management_endpoint_url),
            (RESOURCE_MANAGER_ENDPOINT_URL, &self.resource_manager_endpoint_url),
            (GALLERY_ENDPOINT_URL, &self.gallery_endpoint_url),
            (ACTIVE_DIRECTORY_ENDPOINT_URL, &self.active_directory_endpoint_url),
            (ACTIVE_DIRECTORY_RESOURCE_ID, &self.active_directory_resource_id),
            (ACTIVE_DIRECTORY_GRAPH_RESOURCE_ID, &self.active_directory_graph_resource_id),
            (STORAGE_ENDPOINT_SUFFIX, &self.storage_endpoint_suffix),
            (KEY_VAULT_DNS_SUFFIX, &self.key_vault_dns_suffix),
        ]
    }

    /// OAuth2 scope for the resource-management API.
    pub fn management_scope(&self) -> String {
        format!("{}/.default", self.active_directory_resource_id.trim_end_matches('/'))
    }

    /// OAuth2 scope for the key-vault data plane, e.g. `https://vault.local.example/.default`.
    pub fn key_vault_scope(&self) -> String {
        format!("https://{}/.default", self.key_vault_dns_suffix.trim_start_matches('.'))
    }

    /// ARM base URL without a trailing slash.
    pub fn resource_manager_base(&self) -> &str {
        self.resource_manager_endpoint_url.trim_end_matches('/')
    }
}

// ── Identity ─────────────────────────────────────────────────────────────────

/// Service principal credentials. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
}

impl Identity {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

// ── Resources ────────────────────────────────────────────────────────────────

pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub tags: Tags,
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    Storage,
    StorageV2,
    BlobStorage,
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageKind::Storage => write!(f, "Storage"),
            StorageKind::StorageV2 => write!(f, "StorageV2"),
            StorageKind::BlobStorage => write!(f, "BlobStorage"),
        }
    }
}

impl std::str::FromStr for StorageKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Storage" => Ok(StorageKind::Storage),
            "StorageV2" => Ok(StorageKind::StorageV2),
            "BlobStorage" => Ok(StorageKind::BlobStorage),
            other => Err(DomainError::InvalidConfig(format!("unknown storage kind '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAccount {
    pub id: String,
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub kind: StorageKind,
    pub sku: String,
    pub creation_time: Option<DateTime<Utc>>,
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccountSpec {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub kind: StorageKind,
    pub sku: String,
}

impl StorageAccountSpec {
    /// General-purpose (`Storage`) account with locally redundant storage.
    pub fn general_purpose(
        name: impl Into<String>,
        resource_group: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_group: resource_group.into(),
            location: location.into(),
            kind: StorageKind::Storage,
            sku: "Standard_LRS".into(),
        }
    }
}

/// One access key of a storage account. `Debug` hides the key material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAccountKey {
    pub key_name: String,
    pub value: String,
    pub permissions: String,
}

impl std::fmt::Debug for StorageAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAccountKey")
            .field("key_name", &self.key_name)
            .field("value", &"<redacted>")
            .field("permissions", &self.permissions)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub id: String,
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub vault_uri: String,
    pub sku: String,
}

/// Everything needed to create a key vault with a single access policy that
/// grants the given object id every secret permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSpec {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub tenant_id: String,
    pub access_policy_object_id: String,
    pub enabled_for_deployment: bool,
    pub enabled_for_template_deployment: bool,
    pub sku: String,
}

pub const ALL_SECRET_PERMISSIONS: [&str; 8] = [
    "get", "list", "set", "delete", "backup", "restore", "recover", "purge",
];

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub value: String,
    pub id: Option<String>,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("id", &self.id)
            .finish()
    }
}
