//! Fire-and-forget beacon transports.
//!
//! Dispatching never blocks the caller and never reports back: there is no
//! retry, no timeout handling and no success callback. A slow or unreachable
//! collector has no effect on playback or on later ticks.

use log::{debug, info, warn};
use tokio::runtime::Handle;

use crate::error_handling::types::DispatchError;

/// Sends one beacon URL somewhere. Implementations must return immediately.
pub trait BeaconDispatcher: Send + Sync {
    fn dispatch(&self, url: &str);
}

/// Issues each beacon as an HTTP(S) GET on the current tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct HttpDispatcher {
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn send(
        client: reqwest::Client,
        url: String,
    ) -> Result<reqwest::StatusCode, DispatchError> {
        let response = client.get(&url).send().await?;
        Ok(response.status())
    }
}

impl BeaconDispatcher for HttpDispatcher {
    fn dispatch(&self, url: &str) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("Dropping beacon {}: {}", url, DispatchError::NoRuntime);
                return;
            }
        };

        let client = self.client.clone();
        let url = url.to_string();
        handle.spawn(async move {
            match Self::send(client, url.clone()).await {
                Ok(status) => debug!("Beacon {} answered {}", url, status),
                Err(e) => warn!("Beacon {} not delivered: {}", url, e),
            }
        });
    }
}

/// Dry-run transport: beacons only reach the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

impl BeaconDispatcher for LogDispatcher {
    fn dispatch(&self, url: &str) {
        info!("Beacon (dry run): {}", url);
    }
}
