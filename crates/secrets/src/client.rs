/// Secret store client
///
/// Speaks the store's HTTP API: token verification or service-identity
/// login, then authenticated KV v2 reads. Reads are pure and idempotent;
/// every call carries its own bounded timeout.
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::entry::SecretEntry;
use crate::error::{AuthError, ReadError};

pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

const TOKEN_HEADER: &str = "X-Vault-Token";
const SERVICE_ACCOUNT_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// How the client proves itself to the store.
#[derive(Debug, Clone)]
pub enum StoreCredential {
    /// Static token, operator-supplied (bare host, compose).
    Token(String),
    /// Platform-issued service identity: the pod's service-account JWT is
    /// exchanged for a store token under the named role.
    Kubernetes { role: String },
}

/// An authenticated session against the store.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
}

impl Session {
    fn token(&self) -> &str {
        &self.token
    }
}

pub struct SecretStoreClient {
    http: reqwest::Client,
    address: Url,
    mount: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: Option<LoginAuth>,
}

#[derive(Deserialize)]
struct LoginAuth {
    #[serde(default)]
    client_token: String,
}

#[derive(Deserialize, Default)]
struct KvReadResponse {
    #[serde(default)]
    data: KvPayload,
}

#[derive(Deserialize, Default)]
struct KvPayload {
    #[serde(default)]
    data: serde_json::Map<String, serde_json::Value>,
}

impl SecretStoreClient {
    pub fn new(address: Url, mount: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            address,
            mount: mount.into(),
        }
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub(crate) fn api_url(&self, suffix: &str) -> String {
        format!("{}/{}", self.address.as_str().trim_end_matches('/'), suffix)
    }

    /// Establish a session. Empty credentials are rejected locally; network
    /// and store-side rejections come back as typed values for the caller
    /// to fall back on.
    pub async fn authenticate(&self, credential: &StoreCredential) -> Result<Session, AuthError> {
        match credential {
            StoreCredential::Token(token) => {
                let token = token.trim();
                if token.is_empty() {
                    return Err(AuthError::InvalidCredential("empty store token".into()));
                }
                self.verify_token(token).await?;
                Ok(Session {
                    token: token.to_string(),
                })
            }
            StoreCredential::Kubernetes { role } => {
                if role.trim().is_empty() {
                    return Err(AuthError::InvalidCredential("empty identity role".into()));
                }
                let jwt = std::fs::read_to_string(SERVICE_ACCOUNT_JWT_PATH).map_err(|e| {
                    AuthError::InvalidCredential(format!("service account token unavailable: {e}"))
                })?;
                self.login_with_identity_token(role, jwt.trim()).await
            }
        }
    }

    /// Exchange a platform identity token for a store session under `role`.
    pub async fn login_with_identity_token(
        &self,
        role: &str,
        jwt: &str,
    ) -> Result<Session, AuthError> {
        let url = self.api_url("v1/auth/kubernetes/login");
        let response = self
            .http
            .post(url)
            .timeout(READ_TIMEOUT)
            .json(&json!({ "role": role, "jwt": jwt }))
            .send()
            .await
            .map_err(|e| AuthError::NetworkUnreachable(transport_reason(&e)))?;

        let status = response.status();
        if status.is_success() {
            let login: LoginResponse = response
                .json()
                .await
                .map_err(|e| AuthError::IdentityRejected(format!("malformed login response: {e}")))?;
            let token = login.auth.map(|a| a.client_token).unwrap_or_default();
            if token.is_empty() {
                return Err(AuthError::IdentityRejected(
                    "login returned no client token".into(),
                ));
            }
            tracing::debug!(role = %role, "Secret store identity login succeeded");
            return Ok(Session { token });
        }

        match status {
            StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Err(
                AuthError::IdentityRejected(format!("role `{role}` rejected with status {status}")),
            ),
            _ => Err(AuthError::NetworkUnreachable(format!(
                "unexpected login status {status}"
            ))),
        }
    }

    async fn verify_token(&self, token: &str) -> Result<(), AuthError> {
        let url = self.api_url("v1/auth/token/lookup-self");
        let response = self
            .http
            .get(url)
            .timeout(READ_TIMEOUT)
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(|e| AuthError::NetworkUnreachable(transport_reason(&e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        match status {
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredential(
                format!("token lookup rejected with status {status}"),
            )),
            _ => Err(AuthError::NetworkUnreachable(format!(
                "unexpected token lookup status {status}"
            ))),
        }
    }

    pub(crate) async fn http_get_with_timeout(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<u16, String> {
        self.http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map(|r| r.status().as_u16())
            .map_err(|e| transport_reason(&e))
    }

    /// Fetch one named path's key/value pairs from the configured mount.
    pub async fn read_secret_path(
        &self,
        session: &Session,
        path: &str,
    ) -> Result<SecretEntry, ReadError> {
        let url = self.api_url(&format!("v1/{}/data/{}", self.mount, path));
        let response = self
            .http
            .get(url)
            .timeout(READ_TIMEOUT)
            .header(TOKEN_HEADER, session.token())
            .send()
            .await
            .map_err(|e| ReadError::TransientNetwork {
                path: path.to_string(),
                reason: transport_reason(&e),
            })?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => Err(ReadError::NotFound(path.to_string())),
            StatusCode::FORBIDDEN => Err(ReadError::PermissionDenied(path.to_string())),
            _ if status.is_success() => {
                let kv: KvReadResponse =
                    response.json().await.map_err(|e| ReadError::TransientNetwork {
                        path: path.to_string(),
                        reason: format!("malformed read response: {e}"),
                    })?;
                let entry = SecretEntry::from_kv_data(path, &kv.data.data);
                tracing::debug!(path = %path, keys = entry.len(), "Read secret path");
                Ok(entry)
            }
            _ => Err(ReadError::TransientNetwork {
                path: path.to_string(),
                reason: format!("unexpected read status {status}"),
            }),
        }
    }
}

fn transport_reason(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}
