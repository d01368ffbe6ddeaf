/// Pre-flight reachability probe
///
/// A bounded check against the store's health endpoint, run before the full
/// read sequence. `Degraded` is advisory: the caller logs it and resolves
/// from lower-precedence sources instead of paying for doomed reads.
use std::time::Duration;

use crate::client::SecretStoreClient;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Degraded(String),
}

impl SecretStoreClient {
    pub async fn probe_health(&self) -> ProbeOutcome {
        let url = self.api_url("v1/sys/health?standbyok=true");
        match self.http_get_with_timeout(&url, PROBE_TIMEOUT).await {
            Ok(status) => match status {
                // 429/473 are standby answers; a standby still serves reads.
                200 | 429 | 473 => ProbeOutcome::Healthy,
                501 => ProbeOutcome::Degraded("store is not initialized".into()),
                503 => ProbeOutcome::Degraded("store is sealed".into()),
                other => ProbeOutcome::Degraded(format!("unexpected health status {other}")),
            },
            Err(reason) => ProbeOutcome::Degraded(reason),
        }
    }
}
