use std::path::Path;

use stackarm_domain::{Identity, SubscriptionId};
use tracing::debug;

use crate::error::ConfigError;
use crate::raw::RawSettings;

/// Validated settings for one sample run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub identity: Identity,
    pub subscription_id: SubscriptionId,
    /// ARM endpoint of the target cloud, e.g. `https://management.local.azurestack.external`.
    pub resource_manager_url: String,
    pub location: String,
    pub client_object_id: Option<String>,
    /// Where the settings were read from; used in error messages.
    pub source: String,
}

impl Settings {
    /// The object id that receives the key-vault access policy.
    pub fn require_client_object_id(&self) -> Result<&str, ConfigError> {
        self.client_object_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingKey {
                path: self.source.clone(),
                key: "clientObjectId",
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Json,
    Yaml,
}

impl SettingsFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" | "" => Ok(SettingsFormat::Json),
            "yml" | "yaml" => Ok(SettingsFormat::Yaml),
            other => Err(ConfigError::UnsupportedFormat {
                path: path.display().to_string(),
                extension: other.to_string(),
            }),
        }
    }
}

/// Read and validate a settings file. The format follows the extension:
/// `.json` (or none) and `.yml`/`.yaml`.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let format = SettingsFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    debug!("Loading settings from {}", path.display());
    parse_settings(&content, format, &path.display().to_string())
}

/// Parse settings from an in-memory document. `source` only labels errors.
pub fn parse_settings(
    content: &str,
    format: SettingsFormat,
    source: &str,
) -> Result<Settings, ConfigError> {
    let raw: RawSettings = match format {
        SettingsFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::JsonParse {
            path: source.to_string(),
            source: e,
        })?,
        SettingsFormat::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::YamlParse {
            path: source.to_string(),
            source: e,
        })?,
    };
    convert_settings(raw, source)
}

fn convert_settings(raw: RawSettings, source: &str) -> Result<Settings, ConfigError> {
    let required = |value: Option<String>, key: &'static str| -> Result<String, ConfigError> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(ConfigError::MissingKey { path: source.to_string(), key }),
        }
    };

    let client_id       = required(raw.client_id, "clientId")?;
    let client_secret   = required(raw.client_secret, "clientSecret")?;
    let subscription_id = required(raw.subscription_id, "subscriptionId")?;
    let tenant_id       = required(raw.tenant_id, "tenantId")?;
    let arm_endpoint    = required(raw.resource_manager_url, "resourceManagerUrl")?;
    let location        = required(raw.location, "location")?;

    Ok(Settings {
        identity: Identity::new(client_id, client_secret, tenant_id),
        subscription_id: SubscriptionId::new(subscription_id),
        resource_manager_url: arm_endpoint,
        location,
        client_object_id: raw.client_object_id.filter(|s| !s.trim().is_empty()),
        source: source.to_string(),
    })
}
