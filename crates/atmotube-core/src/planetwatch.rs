//! HTTP transport for the PlanetWatch endpoints.
//!
//! Executes the [`OutboundRequest`]s emitted by the
//! [`SyncScheduler`](crate::sync::SyncScheduler). Every HTTP status comes
//! back as a [`RemoteResponse`]; the scheduler decides what counts as
//! success.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use atmotube_core::{DeviceSession, Geolocation, SyncSettings};
//! use atmotube_core::planetwatch::HttpTransport;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(Duration::from_secs(10))?;
//! let session = DeviceSession::new(
//!     "CC:61:37:BB:02:02",
//!     SyncSettings::enabled_at(Geolocation::new(40.44, -111.87, 1649.0)),
//!     Arc::new(transport),
//! );
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{Error, Result};
use crate::sync::{HttpMethod, OutboundRequest, RemoteError, RemoteResponse};
use crate::traits::Transport;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Create a transport with a custom reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &OutboundRequest,
    ) -> std::result::Result<RemoteResponse, RemoteError> {
        debug!("{} {}", request.method, request.url);

        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let unreachable = |e: reqwest::Error| RemoteError::Unreachable {
            url: request.url.clone(),
            message: e.to_string(),
        };
        let response = builder.send().await.map_err(unreachable)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(unreachable)?;
        Ok(RemoteResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::RequestKind;

    #[test]
    fn test_new_transport() {
        assert!(HttpTransport::new(DEFAULT_TIMEOUT).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let transport = HttpTransport::new(Duration::from_millis(500)).unwrap();
        let request = OutboundRequest {
            kind: RequestKind::CheckRegistration,
            method: HttpMethod::Get,
            url: "http://127.0.0.1:1/checkSensor/aa".to_string(),
            body: None,
        };
        let result = transport.send(&request).await;
        assert!(matches!(result, Err(RemoteError::Unreachable { .. })));
    }
}
