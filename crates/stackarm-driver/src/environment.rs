use std::time::Duration;

use serde_json::Value;
use stackarm_domain::{
    DomainError, EnvironmentDescriptor, ACTIVE_DIRECTORY_ENDPOINT_URL,
    ACTIVE_DIRECTORY_GRAPH_RESOURCE_ID, ACTIVE_DIRECTORY_RESOURCE_ID, GALLERY_ENDPOINT_URL,
    KEY_VAULT_DNS_SUFFIX, MANAGEMENT_ENDPOINT_URL, RESOURCE_MANAGER_ENDPOINT_URL,
    STORAGE_ENDPOINT_SUFFIX,
};
use tracing::{debug, info};

use crate::error::DiscoveryError;

pub const METADATA_API_VERSION: &str = "2019-10-01";

/// Applied to every outbound request unless the caller supplies its own client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// JSON pointers into the first metadata record.
const AUDIENCE: &str = "/authentication/audiences/0";
const LOGIN_ENDPOINT: &str = "/authentication/loginEndpoint";
const GALLERY: &str = "/gallery";
const GRAPH: &str = "/graph";
const STORAGE_SUFFIX: &str = "/suffixes/storage";
const KEY_VAULT_SUFFIX: &str = "/suffixes/keyVaultDns";

/// Discovers the endpoint topology of a cloud from its ARM endpoint.
///
/// One GET, no retries. Without the endpoints nothing else can run, so every
/// failure here is meant to abort startup.
#[derive(Clone)]
pub struct EnvironmentResolver {
    client: reqwest::Client,
}

impl EnvironmentResolver {
    /// Resolver with [`DEFAULT_TIMEOUT`].
    pub fn new() -> Result<Self, DiscoveryError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::Transport {
                url: String::new(),
                message: format!("building http client: {}", e),
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetch `{arm_endpoint}/metadata/endpoints` and map the first record into
    /// an [`EnvironmentDescriptor`].
    pub async fn resolve(&self, arm_endpoint: &str) -> Result<EnvironmentDescriptor, DiscoveryError> {
        if arm_endpoint.trim().is_empty() {
            return Err(DomainError::MissingEndpoint(RESOURCE_MANAGER_ENDPOINT_URL).into());
        }

        let url = metadata_url(arm_endpoint);
        debug!(url, "Fetching cloud endpoint metadata");

        let resp = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DiscoveryError::HttpFailure { url, status: status.as_u16() });
        }

        let body = resp.text().await.map_err(|e| transport_error(&url, e))?;
        let descriptor = descriptor_from_metadata(arm_endpoint, &body)?;
        info!(
            arm_endpoint,
            authority = %descriptor.active_directory_endpoint_url,
            "Resolved cloud environment"
        );
        Ok(descriptor)
    }
}

/// `{arm_endpoint}/metadata/endpoints?api-version=2019-10-01`, without doubling
/// a trailing slash on the endpoint.
pub fn metadata_url(arm_endpoint: &str) -> String {
    format!(
        "{}/metadata/endpoints?api-version={}",
        arm_endpoint.trim_end_matches('/'),
        METADATA_API_VERSION,
    )
}

/// Map a metadata document into a descriptor.
///
/// Only the first record of the array is read; any further records are
/// ignored. `arm_endpoint` is passed through verbatim.
pub fn descriptor_from_metadata(
    arm_endpoint: &str,
    body: &str,
) -> Result<EnvironmentDescriptor, DiscoveryError> {
    let doc: Value = serde_json::from_str(body).map_err(|e| DiscoveryError::EmptyOrMalformed {
        reason: format!("not valid JSON: {}", e),
    })?;
    let records = doc.as_array().ok_or_else(|| DiscoveryError::EmptyOrMalformed {
        reason: format!("expected a JSON array, got {}", json_kind(&doc)),
    })?;
    let metadata = records.first().ok_or_else(|| DiscoveryError::EmptyOrMalformed {
        reason: "metadata array is empty".into(),
    })?;

    let field = |path: &'static str| -> Result<&str, DiscoveryError> {
        metadata
            .pointer(path)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or(DiscoveryError::MissingField { path })
    };

    let audience = field(AUDIENCE)?;
    let entries = [
        (MANAGEMENT_ENDPOINT_URL, audience.to_string()),
        (RESOURCE_MANAGER_ENDPOINT_URL, arm_endpoint.to_string()),
        (GALLERY_ENDPOINT_URL, field(GALLERY)?.to_string()),
        (ACTIVE_DIRECTORY_ENDPOINT_URL, field(LOGIN_ENDPOINT)?.to_string()),
        (ACTIVE_DIRECTORY_RESOURCE_ID, audience.to_string()),
        (ACTIVE_DIRECTORY_GRAPH_RESOURCE_ID, field(GRAPH)?.to_string()),
        (STORAGE_ENDPOINT_SUFFIX, format!(".{}", field(STORAGE_SUFFIX)?)),
        (KEY_VAULT_DNS_SUFFIX, format!(".{}", field(KEY_VAULT_SUFFIX)?)),
    ];

    Ok(EnvironmentDescriptor::from_entries(entries)?)
}

fn transport_error(url: &str, e: reqwest::Error) -> DiscoveryError {
    if e.is_timeout() {
        DiscoveryError::Timeout { url: url.to_string() }
    } else {
        DiscoveryError::Transport { url: url.to_string(), message: e.to_string() }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    fn record(audience: &str, graph: &str) -> Value {
        json!({
            "authentication": {
                "audiences": [audience],
                "loginEndpoint": "https://login.example/"
            },
            "gallery": "https://gallery.example/",
            "graph": graph,
            "suffixes": {
                "storage": "core.example.net",
                "keyVaultDns": "vault.example.net"
            }
        })
    }

    async fn serve_metadata(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/metadata/endpoints"))
            .and(query_param("api-version", METADATA_API_VERSION))
            .and(header("accept", "application/json"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    // ── descriptor_from_metadata (pure) ───────────────────────────────────────

    #[test]
    fn metadata_url_does_not_double_slash() {
        assert_eq!(
            metadata_url("https://arm.example/"),
            "https://arm.example/metadata/endpoints?api-version=2019-10-01"
        );
    }

    #[test]
    fn first_record_wins() {
        let body = json!([record("aud0", "https://graph0/"), record("aud1", "https://graph1/")]);
        let d = descriptor_from_metadata("https://arm.example", &body.to_string()).unwrap();
        assert_eq!(d.management_endpoint_url, "aud0");
        assert_eq!(d.active_directory_resource_id, "aud0");
        assert_eq!(d.active_directory_graph_resource_id, "https://graph0/");
    }

    #[test]
    fn arm_endpoint_is_passed_through_verbatim() {
        let body = json!([record("aud0", "https://graph.example/")]).to_string();
        for endpoint in ["https://arm.example", "https://arm.example/", "http://10.0.0.1:30024"] {
            let d = descriptor_from_metadata(endpoint, &body).unwrap();
            assert_eq!(d.resource_manager_endpoint_url, endpoint);
        }
    }

    #[test]
    fn suffixes_are_dot_prefixed() {
        let body = json!([record("aud0", "https://graph.example/")]).to_string();
        let d = descriptor_from_metadata("https://arm.example", &body).unwrap();
        assert!(d.storage_endpoint_suffix.starts_with('.'));
        assert!(d.key_vault_dns_suffix.starts_with('.'));
    }

    #[test]
    fn empty_array_is_malformed() {
        let err = descriptor_from_metadata("https://arm.example", "[]").unwrap_err();
        assert!(matches!(err, DiscoveryError::EmptyOrMalformed { .. }), "got {err}");
    }

    #[test]
    fn object_instead_of_array_is_malformed() {
        let body = record("aud0", "https://graph.example/").to_string();
        let err = descriptor_from_metadata("https://arm.example", &body).unwrap_err();
        assert!(matches!(err, DiscoveryError::EmptyOrMalformed { .. }), "got {err}");
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = descriptor_from_metadata("https://arm.example", "<html>").unwrap_err();
        assert!(matches!(err, DiscoveryError::EmptyOrMalformed { .. }), "got {err}");
    }

    #[test]
    fn missing_graph_is_reported_by_path() {
        let mut rec = record("aud0", "https://graph.example/");
        rec.as_object_mut().unwrap().remove("graph");
        let body = json!([rec]).to_string();
        let err = descriptor_from_metadata("https://arm.example", &body).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingField { path: "/graph" }), "got {err}");
    }

    #[test]
    fn blank_graph_is_reported_by_path() {
        let body = json!([record("aud0", "  ")]).to_string();
        let err = descriptor_from_metadata("https://arm.example", &body).unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingField { path: "/graph" }), "got {err}");
    }

    #[test]
    fn empty_audiences_is_missing_field() {
        let mut rec = record("aud0", "https://graph.example/");
        rec["authentication"]["audiences"] = json!([]);
        let body = json!([rec]).to_string();
        let err = descriptor_from_metadata("https://arm.example", &body).unwrap_err();
        assert!(
            matches!(err, DiscoveryError::MissingField { path: "/authentication/audiences/0" }),
            "got {err}"
        );
    }

    // ── resolve (HTTP) ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn resolve_end_to_end() {
        let server = MockServer::start().await;
        serve_metadata(
            &server,
            ResponseTemplate::new(200).set_body_json(json!([record("aud0", "https://graph.example/")])),
        )
        .await;

        let resolver = EnvironmentResolver::new().unwrap();
        let arm = server.uri();
        let d = resolver.resolve(&arm).await.unwrap();

        assert_eq!(d.management_endpoint_url, "aud0");
        assert_eq!(d.resource_manager_endpoint_url, arm);
        assert_eq!(d.gallery_endpoint_url, "https://gallery.example/");
        assert_eq!(d.active_directory_endpoint_url, "https://login.example/");
        assert_eq!(d.active_directory_resource_id, "aud0");
        assert_eq!(d.active_directory_graph_resource_id, "https://graph.example/");
        assert_eq!(d.storage_endpoint_suffix, ".core.example.net");
        assert_eq!(d.key_vault_dns_suffix, ".vault.example.net");
    }

    #[tokio::test]
    async fn resolve_non_success_status_is_http_failure() {
        let server = MockServer::start().await;
        serve_metadata(&server, ResponseTemplate::new(503)).await;

        let err = EnvironmentResolver::new().unwrap().resolve(&server.uri()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::HttpFailure { status: 503, .. }), "got {err}");
    }

    #[tokio::test]
    async fn resolve_empty_array_is_malformed() {
        let server = MockServer::start().await;
        serve_metadata(&server, ResponseTemplate::new(200).set_body_json(json!([]))).await;

        let err = EnvironmentResolver::new().unwrap().resolve(&server.uri()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::EmptyOrMalformed { .. }), "got {err}");
    }

    #[tokio::test]
    async fn resolve_slow_server_times_out() {
        let server = MockServer::start().await;
        serve_metadata(
            &server,
            ResponseTemplate::new(200)
                .set_body_json(json!([record("aud0", "https://graph.example/")]))
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let resolver = EnvironmentResolver::with_timeout(Duration::from_millis(100)).unwrap();
        let err = resolver.resolve(&server.uri()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Timeout { .. }), "got {err}");
    }

    #[tokio::test]
    async fn resolve_rejects_blank_endpoint_without_a_request() {
        let err = EnvironmentResolver::new().unwrap().resolve("  ").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Descriptor(_)), "got {err}");
    }
}
