use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use stackarm_domain::{
    ResourceGroup, StorageAccount, StorageAccountKey, StorageAccountSpec, StorageKind, Tags, Vault,
    VaultSpec, ALL_SECRET_PERMISSIONS,
};
use tracing::{debug, info};

use crate::error::ArmError;
use crate::manager::ResourceManager;
use crate::session::Session;

// API versions supported by stack clouds (2020-09-01-hybrid profile).
pub const RESOURCES_API_VERSION: &str = "2019-10-01";
pub const STORAGE_API_VERSION: &str = "2019-06-01";
pub const KEYVAULT_API_VERSION: &str = "2019-09-01";

/// [`ResourceManager`] backed by direct ARM REST calls.
pub struct ArmResourceManager {
    session:     Session,
    client:      reqwest::Client,
    base:        String,
    poll_delays: Vec<Duration>,
    max_polls:   usize,
}

struct ArmResponse {
    status: u16,
    body:   Value,
}

impl ArmResourceManager {
    pub fn new(session: Session) -> Self {
        let client = session.http_client().clone();
        let base = session.environment().resource_manager_base().to_string();
        Self {
            session,
            client,
            base,
            poll_delays: [1u64, 2, 4, 8, 16, 30].into_iter().map(Duration::from_secs).collect(),
            max_polls:   120,
        }
    }

    /// Override how long-running creates are polled. Delays cycle.
    pub fn with_polling(mut self, delays: Vec<Duration>, max_polls: usize) -> Self {
        if !delays.is_empty() {
            self.poll_delays = delays;
        }
        self.max_polls = max_polls.max(1);
        self
    }

    fn subscription_url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}{}?api-version={}",
            self.base,
            self.session.subscription_id(),
            path,
            api_version,
        )
    }

    fn resource_url(&self, id: &str, suffix: &str, api_version: &str) -> String {
        format!("{}{}{}?api-version={}", self.base, id, suffix, api_version)
    }

    // ── ARM error parsing ─────────────────────────────────────────────────────

    fn parse_arm_error(body: &Value) -> String {
        let err = body
            .get("error")
            .or_else(|| body.get("Error"))
            .unwrap_or(body);
        let code    = err["code"].as_str().unwrap_or("Unknown");
        let message = err["message"].as_str().unwrap_or("unknown error");
        format!("{}: {}", code, message)
    }

    fn status_error(verb: &'static str, url: &str, resp: &ArmResponse) -> ArmError {
        if resp.status == 404 {
            return ArmError::NotFound { method: verb, url: url.to_string() };
        }
        ArmError::Status {
            method:  verb,
            url:     url.to_string(),
            status:  resp.status,
            message: Self::parse_arm_error(&resp.body),
        }
    }

    // ── ARM HTTP verbs ────────────────────────────────────────────────────────

    async fn arm_request(
        &self,
        verb: &'static str,
        url: &str,
        body: Option<&Value>,
    ) -> Result<ArmResponse, ArmError> {
        let token = self.session.management_token().await?;
        debug!(url, "ARM {}", verb);

        let method = reqwest::Method::from_bytes(verb.as_bytes()).map_err(|e| ArmError::Request {
            method:  verb,
            url:     url.to_string(),
            message: e.to_string(),
        })?;
        let mut req = self.client.request(method, url).bearer_auth(&token);
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await.map_err(|e| ArmError::Request {
            method:  verb,
            url:     url.to_string(),
            message: e.to_string(),
        })?;

        let status = resp.status().as_u16();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        Ok(ArmResponse { status, body })
    }

    async fn arm_get(&self, url: &str) -> Result<Value, ArmError> {
        let resp = self.arm_request("GET", url, None).await?;
        if resp.status == 200 {
            return Ok(resp.body);
        }
        Err(Self::status_error("GET", url, &resp))
    }

    async fn arm_patch(&self, url: &str, body: &Value) -> Result<Value, ArmError> {
        let resp = self.arm_request("PATCH", url, Some(body)).await?;
        if (200..300).contains(&resp.status) {
            return Ok(resp.body);
        }
        Err(Self::status_error("PATCH", url, &resp))
    }

    async fn arm_post(&self, url: &str, body: &Value) -> Result<Value, ArmError> {
        let resp = self.arm_request("POST", url, Some(body)).await?;
        if (200..300).contains(&resp.status) {
            return Ok(resp.body);
        }
        Err(Self::status_error("POST", url, &resp))
    }

    /// DELETE without waiting for the operation to finish. 404 is reported
    /// as [`ArmError::NotFound`] so callers can tell "nothing to delete" apart.
    async fn arm_delete(&self, url: &str) -> Result<(), ArmError> {
        let resp = self.arm_request("DELETE", url, None).await?;
        match resp.status {
            200 | 202 | 204 => Ok(()),
            _ => Err(Self::status_error("DELETE", url, &resp)),
        }
    }

    /// PUT, then poll the resource until its provisioning state is terminal
    /// when ARM accepted the request asynchronously.
    async fn arm_put_and_wait(&self, url: &str, body: &Value) -> Result<Value, ArmError> {
        let resp = self.arm_request("PUT", url, Some(body)).await?;
        match resp.status {
            200 | 201 if is_terminal(&resp.body) => {
                if resp.body.get("error").is_some() {
                    return Err(ArmError::OperationFailed(format!(
                        "PUT {}: {}",
                        url,
                        Self::parse_arm_error(&resp.body)
                    )));
                }
                Ok(resp.body)
            }
            200 | 201 | 202 => self.wait_for_provisioning(url).await,
            _ => Err(Self::status_error("PUT", url, &resp)),
        }
    }

    /// Poll `GET url` until `properties.provisioningState` is `Succeeded`.
    ///
    /// A 404 while polling means the resource is not visible yet.
    async fn wait_for_provisioning(&self, url: &str) -> Result<Value, ArmError> {
        for (i, delay) in self.poll_delays.iter().cycle().take(self.max_polls).enumerate() {
            let resp = self.arm_request("GET", url, None).await?;
            match resp.status {
                200 => {
                    let state = provisioning_state(&resp.body).unwrap_or("Succeeded").to_string();
                    match state.as_str() {
                        "Succeeded" => return Ok(resp.body),
                        "Failed" | "Canceled" => {
                            return Err(ArmError::OperationFailed(format!(
                                "provisioning {} ended in state {}",
                                url, state
                            )));
                        }
                        _ => {}
                    }
                }
                404 => {}
                _ => return Err(Self::status_error("GET", url, &resp)),
            }

            let poll = i + 1;
            if poll % 10 == 0 {
                info!(poll, url, "still waiting for ARM provisioning");
            } else {
                debug!(poll, url, delay_ms = delay.as_millis() as u64, "ARM provisioning pending");
            }
            tokio::time::sleep(*delay).await;
        }

        Err(ArmError::OperationFailed(format!(
            "provisioning {} did not finish after {} polls",
            url, self.max_polls
        )))
    }

    /// GET a collection, following `nextLink` until exhausted.
    async fn arm_list(&self, url: &str) -> Result<Vec<Value>, ArmError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        while let Some(page_url) = next.take() {
            let page = self.arm_get(&page_url).await?;
            if let Some(values) = page["value"].as_array() {
                items.extend(values.iter().cloned());
            }
            next = page["nextLink"].as_str().filter(|s| !s.is_empty()).map(str::to_string);
        }
        Ok(items)
    }
}

#[async_trait]
impl ResourceManager for ArmResourceManager {
    fn name(&self) -> &'static str {
        "arm"
    }

    async fn create_resource_group(&self, name: &str, location: &str) -> Result<ResourceGroup, ArmError> {
        let url = self.subscription_url(&format!("/resourcegroups/{}", name), RESOURCES_API_VERSION);
        let body = self.arm_put_and_wait(&url, &json!({ "location": location })).await?;
        parse_resource_group(&body)
    }

    async fn update_resource_group_tags(
        &self,
        group: &ResourceGroup,
        tags: &Tags,
    ) -> Result<ResourceGroup, ArmError> {
        let url = self.subscription_url(&format!("/resourcegroups/{}", group.name), RESOURCES_API_VERSION);
        let mut merged = group.tags.clone();
        merged.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        let body = self.arm_patch(&url, &json!({ "tags": merged })).await?;
        parse_resource_group(&body)
    }

    async fn list_resource_groups(&self) -> Result<Vec<ResourceGroup>, ArmError> {
        let url = self.subscription_url("/resourcegroups", RESOURCES_API_VERSION);
        self.arm_list(&url).await?.iter().map(parse_resource_group).collect()
    }

    async fn begin_delete_resource_group(&self, name: &str) -> Result<(), ArmError> {
        let url = self.subscription_url(&format!("/resourcegroups/{}", name), RESOURCES_API_VERSION);
        self.arm_delete(&url).await
    }

    async fn create_storage_account(&self, spec: &StorageAccountSpec) -> Result<StorageAccount, ArmError> {
        let url = self.subscription_url(
            &format!(
                "/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}",
                spec.resource_group, spec.name
            ),
            STORAGE_API_VERSION,
        );
        let body = json!({
            "location": spec.location,
            "kind": spec.kind.to_string(),
            "sku": { "name": spec.sku },
            "properties": {},
        });
        let created = self.arm_put_and_wait(&url, &body).await?;
        parse_storage_account(&created)
    }

    async fn list_storage_account_keys(
        &self,
        account: &StorageAccount,
    ) -> Result<Vec<StorageAccountKey>, ArmError> {
        let url = self.resource_url(&account.id, "/listKeys", STORAGE_API_VERSION);
        let body = self.arm_post(&url, &json!({})).await?;
        parse_keys(&body)
    }

    async fn regenerate_storage_account_key(
        &self,
        account: &StorageAccount,
        key_name: &str,
    ) -> Result<Vec<StorageAccountKey>, ArmError> {
        let url = self.resource_url(&account.id, "/regenerateKey", STORAGE_API_VERSION);
        let body = self.arm_post(&url, &json!({ "keyName": key_name })).await?;
        parse_keys(&body)
    }

    async fn list_storage_accounts_by_resource_group(
        &self,
        resource_group: &str,
    ) -> Result<Vec<StorageAccount>, ArmError> {
        let url = self.subscription_url(
            &format!("/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts", resource_group),
            STORAGE_API_VERSION,
        );
        self.arm_list(&url).await?.iter().map(parse_storage_account).collect()
    }

    async fn delete_storage_account(&self, id: &str) -> Result<(), ArmError> {
        let url = self.resource_url(id, "", STORAGE_API_VERSION);
        self.arm_delete(&url).await
    }

    async fn create_vault(&self, spec: &VaultSpec) -> Result<Vault, ArmError> {
        let url = self.subscription_url(
            &format!(
                "/resourceGroups/{}/providers/Microsoft.KeyVault/vaults/{}",
                spec.resource_group, spec.name
            ),
            KEYVAULT_API_VERSION,
        );
        let body = json!({
            "location": spec.location,
            "properties": {
                "tenantId": spec.tenant_id,
                "sku": { "family": "A", "name": spec.sku },
                "accessPolicies": [{
                    "tenantId": spec.tenant_id,
                    "objectId": spec.access_policy_object_id,
                    "permissions": { "secrets": ALL_SECRET_PERMISSIONS },
                }],
                "enabledForDeployment": spec.enabled_for_deployment,
                "enabledForTemplateDeployment": spec.enabled_for_template_deployment,
            }
        });
        let created = self.arm_put_and_wait(&url, &body).await?;
        parse_vault(&created)
    }

    async fn delete_vault(&self, id: &str) -> Result<(), ArmError> {
        let url = self.resource_url(id, "", KEYVAULT_API_VERSION);
        self.arm_delete(&url).await
    }
}

// ── Response parsing ──────────────────────────────────────────────────────────

fn provisioning_state(body: &Value) -> Option<&str> {
    body["properties"]["provisioningState"].as_str()
}

fn is_terminal(body: &Value) -> bool {
    matches!(provisioning_state(body), None | Some("Succeeded"))
}

fn str_field<'a>(v: &'a Value, pointer: &str, what: &'static str) -> Result<&'a str, ArmError> {
    v.pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| ArmError::decode(what, format!("missing '{}' in {}", pointer, v)))
}

/// `/subscriptions/{sub}/resourceGroups/{rg}/...` → `rg`.
pub fn resource_group_from_id(id: &str) -> Option<&str> {
    let mut parts = id.split('/');
    while let Some(part) = parts.next() {
        if part.eq_ignore_ascii_case("resourceGroups") {
            return parts.next().filter(|s| !s.is_empty());
        }
    }
    None
}

fn parse_resource_group(v: &Value) -> Result<ResourceGroup, ArmError> {
    let tags: Tags = match v.get("tags") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
            .collect(),
        _ => Tags::new(),
    };
    Ok(ResourceGroup {
        id:                 str_field(v, "/id", "resource group")?.to_string(),
        name:               str_field(v, "/name", "resource group")?.to_string(),
        location:           str_field(v, "/location", "resource group")?.to_string(),
        tags,
        provisioning_state: provisioning_state(v).map(str::to_string),
    })
}

fn parse_storage_account(v: &Value) -> Result<StorageAccount, ArmError> {
    let id = str_field(v, "/id", "storage account")?;
    let kind: StorageKind = str_field(v, "/kind", "storage account")?
        .parse()
        .map_err(|e| ArmError::decode("storage account", format!("{}", e)))?;
    let creation_time = v["properties"]["creationTime"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));
    Ok(StorageAccount {
        id:                 id.to_string(),
        name:               str_field(v, "/name", "storage account")?.to_string(),
        resource_group:     resource_group_from_id(id).unwrap_or_default().to_string(),
        location:           str_field(v, "/location", "storage account")?.to_string(),
        kind,
        sku:                v["sku"]["name"].as_str().unwrap_or_default().to_string(),
        creation_time,
        provisioning_state: provisioning_state(v).map(str::to_string),
    })
}

fn parse_keys(v: &Value) -> Result<Vec<StorageAccountKey>, ArmError> {
    let keys = v["keys"]
        .as_array()
        .ok_or_else(|| ArmError::decode("storage account keys", "missing 'keys' array"))?;
    keys.iter()
        .map(|k| {
            Ok(StorageAccountKey {
                key_name:    str_field(k, "/keyName", "storage account key")?.to_string(),
                value:       str_field(k, "/value", "storage account key")?.to_string(),
                permissions: k["permissions"].as_str().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

fn parse_vault(v: &Value) -> Result<Vault, ArmError> {
    let id = str_field(v, "/id", "vault")?;
    Ok(Vault {
        id:             id.to_string(),
        name:           str_field(v, "/name", "vault")?.to_string(),
        resource_group: resource_group_from_id(id).unwrap_or_default().to_string(),
        location:       str_field(v, "/location", "vault")?.to_string(),
        vault_uri:      str_field(v, "/properties/vaultUri", "vault")?.to_string(),
        sku:            v["properties"]["sku"]["name"].as_str().unwrap_or_default().to_string(),
    })
}

// Used by tests elsewhere in the crate to build descriptors for mock servers.
#[cfg(test)]
pub(crate) fn test_descriptor(arm: &str) -> stackarm_domain::EnvironmentDescriptor {
    stackarm_domain::EnvironmentDescriptor {
        management_endpoint_url:            "https://management.example/".into(),
        resource_manager_endpoint_url:      arm.into(),
        gallery_endpoint_url:               "https://gallery.example/".into(),
        active_directory_endpoint_url:      "https://login.example/".into(),
        active_directory_resource_id:       "https://management.example/".into(),
        active_directory_graph_resource_id: "https://graph.example/".into(),
        storage_endpoint_suffix:            ".core.example.net".into(),
        key_vault_dns_suffix:               ".vault.example.net".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticToken;
    use stackarm_domain::SubscriptionId;
    use std::sync::Arc;
    use wiremock::{
        matchers::{body_json, header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    const SUB: &str = "sub1";

    fn manager(server: &MockServer) -> ArmResourceManager {
        let session = Session::from_parts(
            test_descriptor(&server.uri()),
            SubscriptionId::new(SUB),
            "t1",
            Arc::new(StaticToken("fake-token".into())),
            reqwest::Client::new(),
        );
        ArmResourceManager::new(session).with_polling(vec![Duration::from_millis(10)], 20)
    }

    fn rg_json(name: &str, tags: Value) -> Value {
        json!({
            "id": format!("/subscriptions/{}/resourceGroups/{}", SUB, name),
            "name": name,
            "location": "local",
            "tags": tags,
            "properties": { "provisioningState": "Succeeded" },
        })
    }

    fn sa_json(name: &str, rg: &str, state: &str) -> Value {
        json!({
            "id": format!("/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}", SUB, rg, name),
            "name": name,
            "location": "local",
            "kind": "Storage",
            "sku": { "name": "Standard_LRS" },
            "properties": {
                "provisioningState": state,
                "creationTime": "2024-05-01T10:00:00.0000000Z",
            },
        })
    }

    fn storage_account(rg: &str, name: &str) -> StorageAccount {
        parse_storage_account(&sa_json(name, rg, "Succeeded")).unwrap()
    }

    // ── pure helpers ──────────────────────────────────────────────────────────

    #[test]
    fn parse_arm_error_standard() {
        let body = json!({
            "error": { "code": "ResourceGroupNotFound", "message": "Resource group 'x' could not be found." }
        });
        let msg = ArmResourceManager::parse_arm_error(&body);
        assert!(msg.contains("ResourceGroupNotFound"), "got: {}", msg);
    }

    #[test]
    fn parse_arm_error_missing_fields_gives_fallback() {
        assert_eq!(ArmResourceManager::parse_arm_error(&json!({ "error": {} })), "Unknown: unknown error");
    }

    #[test]
    fn resource_group_from_id_is_case_insensitive() {
        assert_eq!(resource_group_from_id("/subscriptions/s/resourcegroups/rg1/providers/x/y/z"), Some("rg1"));
        assert_eq!(resource_group_from_id("/subscriptions/s/resourceGroups/rg2"), Some("rg2"));
        assert_eq!(resource_group_from_id("/subscriptions/s"), None);
    }

    #[test]
    fn storage_account_parses_creation_time_and_group() {
        let sa = storage_account("rg9", "sa1");
        assert_eq!(sa.resource_group, "rg9");
        assert_eq!(sa.kind, StorageKind::Storage);
        assert!(sa.creation_time.is_some());
    }

    // ── resource groups ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn create_resource_group_puts_location_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("/subscriptions/{}/resourcegroups/rg1", SUB)))
            .and(query_param("api-version", RESOURCES_API_VERSION))
            .and(header("authorization", "Bearer fake-token"))
            .and(body_json(json!({ "location": "local" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(rg_json("rg1", json!({}))))
            .expect(1)
            .mount(&server)
            .await;

        let rg = manager(&server).create_resource_group("rg1", "local").await.unwrap();
        assert_eq!(rg.name, "rg1");
        assert_eq!(rg.location, "local");
    }

    #[tokio::test]
    async fn update_tags_merges_existing_tags() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("/subscriptions/{}/resourcegroups/rg1", SUB)))
            .and(body_json(json!({ "tags": { "env": "dev", "owner": "samples" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(rg_json(
                "rg1",
                json!({ "env": "dev", "owner": "samples" }),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let existing = parse_resource_group(&rg_json("rg1", json!({ "env": "dev" }))).unwrap();
        let mut new_tags = Tags::new();
        new_tags.insert("owner".into(), "samples".into());

        let rg = manager(&server).update_resource_group_tags(&existing, &new_tags).await.unwrap();
        assert_eq!(rg.tags.get("owner").map(String::as_str), Some("samples"));
        assert_eq!(rg.tags.len(), 2);
    }

    #[tokio::test]
    async fn list_resource_groups_follows_next_link() {
        let server = MockServer::start().await;
        let next = format!("{}/page2", server.uri());
        Mock::given(method("GET"))
            .and(path(format!("/subscriptions/{}/resourcegroups", SUB)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [rg_json("rg1", json!({}))],
                "nextLink": next,
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [rg_json("rg2", json!({}))],
            })))
            .mount(&server)
            .await;

        let groups = manager(&server).list_resource_groups().await.unwrap();
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["rg1", "rg2"]);
    }

    #[tokio::test]
    async fn begin_delete_does_not_wait_for_completion() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("/subscriptions/{}/resourcegroups/rg1", SUB)))
            .respond_with(ResponseTemplate::new(202)
                .append_header("Location", format!("{}/operations/del-rg1", server.uri())))
            .expect(1)
            .mount(&server)
            .await;

        manager(&server).begin_delete_resource_group("rg1").await.unwrap();

        let received = server.received_requests().await.unwrap_or_default();
        assert_eq!(received.len(), 1, "delete must not poll the operation");
    }

    #[tokio::test]
    async fn begin_delete_missing_group_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("/subscriptions/{}/resourcegroups/ghost", SUB)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "ResourceGroupNotFound", "message": "not found" }
            })))
            .mount(&server)
            .await;

        let err = manager(&server).begin_delete_resource_group("ghost").await.unwrap_err();
        assert!(err.is_not_found(), "got {err}");
    }

    #[tokio::test]
    async fn server_error_carries_arm_message() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("/subscriptions/{}/resourcegroups/rg1", SUB)))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": "LocationNotAvailableForResourceGroup", "message": "bad location" }
            })))
            .mount(&server)
            .await;

        let err = manager(&server).create_resource_group("rg1", "nowhere").await.unwrap_err();
        match err {
            ArmError::Status { status, message, .. } => {
                assert_eq!(status, 400);
                assert!(message.contains("LocationNotAvailableForResourceGroup"));
            }
            other => panic!("expected Status, got {other}"),
        }
    }

    // ── storage accounts ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn create_storage_account_polls_until_succeeded() {
        let server = MockServer::start().await;
        let sa_path = format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/sa1",
            SUB
        );
        Mock::given(method("PUT"))
            .and(path(sa_path.as_str()))
            .and(body_json(json!({
                "location": "local",
                "kind": "Storage",
                "sku": { "name": "Standard_LRS" },
                "properties": {},
            })))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(sa_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(sa_json("sa1", "rg1", "Creating")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(sa_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(sa_json("sa1", "rg1", "Succeeded")))
            .mount(&server)
            .await;

        let spec = StorageAccountSpec::general_purpose("sa1", "rg1", "local");
        let sa = manager(&server).create_storage_account(&spec).await.unwrap();
        assert_eq!(sa.provisioning_state.as_deref(), Some("Succeeded"));
        assert_eq!(sa.resource_group, "rg1");
    }

    #[tokio::test]
    async fn failed_provisioning_is_an_operation_failure() {
        let server = MockServer::start().await;
        let sa_path = format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/sa1",
            SUB
        );
        Mock::given(method("PUT"))
            .and(path(sa_path.as_str()))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(sa_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(sa_json("sa1", "rg1", "Failed")))
            .mount(&server)
            .await;

        let spec = StorageAccountSpec::general_purpose("sa1", "rg1", "local");
        let err = manager(&server).create_storage_account(&spec).await.unwrap_err();
        assert!(matches!(err, ArmError::OperationFailed(_)), "got {err}");
    }

    #[tokio::test]
    async fn regenerate_key_posts_key_name() {
        let server = MockServer::start().await;
        let account = storage_account("rg1", "sa1");
        Mock::given(method("POST"))
            .and(path(format!("{}/regenerateKey", account.id)))
            .and(query_param("api-version", STORAGE_API_VERSION))
            .and(body_json(json!({ "keyName": "key1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [
                    { "keyName": "key1", "value": "new1", "permissions": "FULL" },
                    { "keyName": "key2", "value": "old2", "permissions": "FULL" },
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let keys = manager(&server).regenerate_storage_account_key(&account, "key1").await.unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].value, "new1");
    }

    #[tokio::test]
    async fn list_storage_accounts_scoped_to_group() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts",
                SUB
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [sa_json("sa1", "rg1", "Succeeded"), sa_json("sa2", "rg1", "Succeeded")]
            })))
            .mount(&server)
            .await;

        let accounts = manager(&server).list_storage_accounts_by_resource_group("rg1").await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert!(accounts.iter().all(|a| a.resource_group == "rg1"));
    }

    // ── key vaults ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn create_vault_grants_secret_permissions_to_object_id() {
        let server = MockServer::start().await;
        let vault_path = format!(
            "/subscriptions/{}/resourceGroups/rg1/providers/Microsoft.KeyVault/vaults/kv1",
            SUB
        );
        Mock::given(method("PUT"))
            .and(path(vault_path.as_str()))
            .and(query_param("api-version", KEYVAULT_API_VERSION))
            .and(body_json(json!({
                "location": "local",
                "properties": {
                    "tenantId": "t1",
                    "sku": { "family": "A", "name": "standard" },
                    "accessPolicies": [{
                        "tenantId": "t1",
                        "objectId": "oid-1",
                        "permissions": { "secrets": ALL_SECRET_PERMISSIONS },
                    }],
                    "enabledForDeployment": true,
                    "enabledForTemplateDeployment": true,
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": vault_path,
                "name": "kv1",
                "location": "local",
                "properties": {
                    "vaultUri": "https://kv1.vault.example.net/",
                    "sku": { "family": "A", "name": "standard" },
                    "provisioningState": "Succeeded",
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let spec = VaultSpec {
            name: "kv1".into(),
            resource_group: "rg1".into(),
            location: "local".into(),
            tenant_id: "t1".into(),
            access_policy_object_id: "oid-1".into(),
            enabled_for_deployment: true,
            enabled_for_template_deployment: true,
            sku: "standard".into(),
        };
        let vault = manager(&server).create_vault(&spec).await.unwrap();
        assert_eq!(vault.vault_uri, "https://kv1.vault.example.net/");
        assert_eq!(vault.resource_group, "rg1");
    }
}
