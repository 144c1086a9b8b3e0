use serde::{Deserialize, Serialize};

/// Raw representation of a service principal settings file
/// (e.g. `azureAppSpConfig.json`). Every field is optional here so that a
/// missing key is reported by name instead of as a generic parse error.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub resource_manager_url: Option<String>,
    pub location: Option<String>,
    /// Only the key-vault sample needs this.
    pub client_object_id: Option<String>,
}
