use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ArmError;

/// Abstraction over bearer-token acquisition; enables test injection.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, scope: &str) -> Result<String, ArmError>;
}

// ── Client secret ─────────────────────────────────────────────────────────────

/// OAuth2 client-credentials flow against `{authority}/{tenant}/oauth2/v2.0/token`.
///
/// Constructing the credential performs no I/O. A token is requested on the
/// first call to [`TokenProvider::token`] for a scope and cached per scope
/// until one minute before it expires.
pub struct ClientSecretCredential {
    authority:     String,
    tenant_id:     String,
    client_id:     String,
    client_secret: String,
    client:        reqwest::Client,
    cache:         Mutex<HashMap<String, (String, Instant)>>,
}

impl ClientSecretCredential {
    pub(crate) fn new(
        authority: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        client: reqwest::Client,
    ) -> Self {
        Self {
            authority:     authority.trim_end_matches('/').to_string(),
            tenant_id:     tenant_id.to_string(),
            client_id:     client_id.to_string(),
            client_secret: client_secret.to_string(),
            client,
            cache:         Mutex::new(HashMap::new()),
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id)
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }
}

impl std::fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("authority", &self.authority)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for ClientSecretCredential {
    async fn token(&self, scope: &str) -> Result<String, ArmError> {
        {
            let guard = self.cache.lock().await;
            if let Some((tok, expiry)) = guard.get(scope) {
                if Instant::now() < *expiry {
                    return Ok(tok.clone());
                }
            }
        }

        let url = self.token_url();
        debug!(url, scope, "Requesting client-credentials token");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];
        let resp = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ArmError::Token(format!("token request to {}: {}", url, e)))?;

        let status = resp.status().as_u16();
        // Error pages from proxies or ADFS are often not JSON.
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if !(200..300).contains(&status) {
            let reason = body["error_description"]
                .as_str()
                .or_else(|| body["error"].as_str())
                .unwrap_or("no error description");
            return Err(ArmError::Token(format!("token endpoint returned {}: {}", status, reason)));
        }

        let tok = body["access_token"]
            .as_str()
            .ok_or_else(|| ArmError::Token("no access_token in token response".into()))?
            .to_string();
        // Some identity providers send expires_in as a string.
        let expires_in = body["expires_in"]
            .as_u64()
            .or_else(|| body["expires_in"].as_str().and_then(|s| s.parse().ok()))
            .unwrap_or(3600);
        let expiry = Instant::now() + Duration::from_secs(expires_in.saturating_sub(60));

        self.cache.lock().await.insert(scope.to_string(), (tok.clone(), expiry));
        Ok(tok)
    }
}

// ── Static (tests, local runs) ────────────────────────────────────────────────

/// Always returns the same token regardless of scope.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self, _scope: &str) -> Result<String, ArmError> {
        Ok(self.0.clone())
    }
}
