/// Secret store access for the registry services
///
/// A small client for the centralized secret store's KV v2 wire API:
/// authentication (static token or platform service identity), per-path
/// reads, and a bounded reachability probe. Every failure is a typed value;
/// the caller decides whether to fall back or abort.

pub mod client;
pub mod entry;
pub mod error;
pub mod probe;

pub use client::{SecretStoreClient, Session, StoreCredential};
pub use entry::{SecretEntry, SecretValue};
pub use error::{AuthError, ReadError};
pub use probe::ProbeOutcome;
