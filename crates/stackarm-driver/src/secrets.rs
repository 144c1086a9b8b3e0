use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use stackarm_domain::{Secret, Vault};
use tracing::debug;

use crate::credential::TokenProvider;
use crate::error::ArmError;
use crate::manager::{SecretStore, SecretStoreFactory};
use crate::session::Session;

pub const SECRETS_API_VERSION: &str = "7.1";

/// Key-vault data-plane client limited to setting and reading secrets.
pub struct VaultSecretClient {
    vault_uri:  String,
    scope:      String,
    credential: Arc<dyn TokenProvider>,
    client:     reqwest::Client,
}

impl VaultSecretClient {
    pub fn new(
        vault_uri: &str,
        scope: impl Into<String>,
        credential: Arc<dyn TokenProvider>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            vault_uri: vault_uri.trim_end_matches('/').to_string(),
            scope: scope.into(),
            credential,
            client,
        }
    }

    fn secret_url(&self, name: &str) -> String {
        format!("{}/secrets/{}?api-version={}", self.vault_uri, name, SECRETS_API_VERSION)
    }

    async fn send(
        &self,
        verb: &'static str,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ArmError> {
        let token = self.credential.token(&self.scope).await?;
        debug!(url, "Key vault {}", verb);

        let req = match body {
            Some(b) => self.client.put(url).json(b),
            None => self.client.get(url),
        };
        let resp = req.bearer_auth(&token).send().await.map_err(|e| ArmError::Request {
            method:  verb,
            url:     url.to_string(),
            message: e.to_string(),
        })?;

        let status = resp.status().as_u16();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        match status {
            200 => Ok(body),
            404 => Err(ArmError::NotFound { method: verb, url: url.to_string() }),
            _ => Err(ArmError::Status {
                method:  verb,
                url:     url.to_string(),
                status,
                message: body["error"]["message"].as_str().unwrap_or("unknown error").to_string(),
            }),
        }
    }
}

fn parse_secret(name: &str, v: &Value) -> Result<Secret, ArmError> {
    let value = v["value"]
        .as_str()
        .ok_or_else(|| ArmError::decode("secret", "missing 'value'"))?;
    Ok(Secret {
        name:  name.to_string(),
        value: value.to_string(),
        id:    v["id"].as_str().map(str::to_string),
    })
}

#[async_trait]
impl SecretStore for VaultSecretClient {
    async fn set_secret(&self, name: &str, value: &str) -> Result<Secret, ArmError> {
        let url = self.secret_url(name);
        let body = self.send("PUT", &url, Some(&json!({ "value": value }))).await?;
        parse_secret(name, &body)
    }

    async fn get_secret(&self, name: &str) -> Result<Secret, ArmError> {
        let url = self.secret_url(name);
        let body = self.send("GET", &url, None).await?;
        parse_secret(name, &body)
    }
}

/// Builds [`VaultSecretClient`]s that authenticate with the session's credential.
pub struct VaultSecretClientFactory {
    session: Session,
}

impl VaultSecretClientFactory {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl SecretStoreFactory for VaultSecretClientFactory {
    fn for_vault(&self, vault: &Vault) -> Result<Arc<dyn SecretStore>, ArmError> {
        if vault.vault_uri.is_empty() {
            return Err(ArmError::decode("vault", format!("vault '{}' has no URI", vault.name)));
        }
        Ok(Arc::new(VaultSecretClient::new(
            &vault.vault_uri,
            self.session.environment().key_vault_scope(),
            self.session.credential(),
            self.session.http_client().clone(),
        )))
    }
}
