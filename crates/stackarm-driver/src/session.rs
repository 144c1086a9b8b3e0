use std::sync::Arc;

use stackarm_domain::{EnvironmentDescriptor, Identity, SubscriptionId};
use tracing::info;

use crate::credential::{ClientSecretCredential, TokenProvider};
use crate::environment::DEFAULT_TIMEOUT;
use crate::error::{ArmError, AuthConfigError};

/// An authenticated context bound to one subscription of one cloud.
///
/// Immutable once built and cheap to clone. Building it makes no network
/// call; the credential fetches a token the first time a collaborator
/// asks for one.
#[derive(Clone)]
pub struct Session {
    environment:     Arc<EnvironmentDescriptor>,
    subscription_id: SubscriptionId,
    tenant_id:       String,
    credential:      Arc<dyn TokenProvider>,
    client:          reqwest::Client,
}

impl Session {
    /// Assemble a session from an already-built credential.
    pub fn from_parts(
        environment: EnvironmentDescriptor,
        subscription_id: SubscriptionId,
        tenant_id: impl Into<String>,
        credential: Arc<dyn TokenProvider>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            environment: Arc::new(environment),
            subscription_id,
            tenant_id: tenant_id.into(),
            credential,
            client,
        }
    }

    pub fn environment(&self) -> &EnvironmentDescriptor {
        &self.environment
    }

    pub fn subscription_id(&self) -> &SubscriptionId {
        &self.subscription_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn credential(&self) -> Arc<dyn TokenProvider> {
        Arc::clone(&self.credential)
    }

    /// HTTP client shared by every collaborator built from this session.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Bearer token for the resource-management API.
    pub async fn management_token(&self) -> Result<String, ArmError> {
        self.credential.token(&self.environment.management_scope()).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("environment", &self.environment)
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

/// Build a [`Session`] with an HTTP client using [`DEFAULT_TIMEOUT`].
pub fn bootstrap(
    descriptor: &EnvironmentDescriptor,
    identity: &Identity,
    subscription_id: &SubscriptionId,
) -> Result<Session, AuthConfigError> {
    let client = reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| AuthConfigError::Client(e.to_string()))?;
    bootstrap_with_client(descriptor, identity, subscription_id, client)
}

/// Build a [`Session`] whose client-secret credential is scoped to the
/// descriptor's authority host and bound to the identity's tenant.
pub fn bootstrap_with_client(
    descriptor: &EnvironmentDescriptor,
    identity: &Identity,
    subscription_id: &SubscriptionId,
    client: reqwest::Client,
) -> Result<Session, AuthConfigError> {
    for (field, value) in [
        ("client id", identity.client_id.as_str()),
        ("client secret", identity.client_secret.as_str()),
        ("tenant id", identity.tenant_id.as_str()),
        ("subscription id", subscription_id.as_str()),
    ] {
        if value.trim().is_empty() {
            return Err(AuthConfigError::EmptyField { field });
        }
    }

    let authority = validate_authority(&descriptor.active_directory_endpoint_url)?;
    let credential = ClientSecretCredential::new(
        &authority,
        &identity.tenant_id,
        &identity.client_id,
        &identity.client_secret,
        client.clone(),
    );

    info!(
        subscription_id = %subscription_id,
        tenant_id = %identity.tenant_id,
        authority = %credential.authority(),
        "Session bootstrapped"
    );

    Ok(Session::from_parts(
        descriptor.clone(),
        subscription_id.clone(),
        identity.tenant_id.clone(),
        Arc::new(credential),
        client,
    ))
}

fn validate_authority(raw: &str) -> Result<String, AuthConfigError> {
    let invalid = |reason: &str| AuthConfigError::InvalidAuthority {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = reqwest::Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("authority must not carry a query or fragment"));
    }
    Ok(url.as_str().to_string())
}
