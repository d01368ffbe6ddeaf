/// Secret store error taxonomy
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("secret store unreachable: {0}")]
    NetworkUnreachable(String),
    #[error("credential rejected by the secret store: {0}")]
    InvalidCredential(String),
    #[error("service identity rejected by the secret store: {0}")]
    IdentityRejected(String),
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("secret path `{0}` not found")]
    NotFound(String),
    #[error("permission denied reading secret path `{0}`")]
    PermissionDenied(String),
    #[error("transient failure reading secret path `{path}`: {reason}")]
    TransientNetwork { path: String, reason: String },
}
