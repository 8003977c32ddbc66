//! Network utilities and helpers

use std::time::Duration;

use crate::core::models::{CoreError, CoreResult};

/// Timeout for the pre-flight connectivity probe
pub const CONNTEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Probe whether a known host is reachable within a short timeout
pub async fn check_connectivity(url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(CONNTEST_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    client.head(url).send().await.is_ok()
}

/// Pre-flight connectivity gate, consulted once before a batch starts
pub async fn ensure_connectivity(url: &str) -> CoreResult<()> {
    if check_connectivity(url).await {
        Ok(())
    } else {
        Err(CoreError::Connection(format!(
            "could not reach {url} within {}s",
            CONNTEST_TIMEOUT.as_secs()
        )))
    }
}
