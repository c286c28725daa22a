use crate::models::{Device, DeviceStatus};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Connection settings of the device authentication service
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub timeout: Duration,
    /// extra attempts on connection failures, timeouts and 5xx responses
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://mender-device-auth:8080".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DevAuthError {
    #[error("invalid deviceauth endpoint '{0}'")]
    InvalidEndpoint(String),
    #[error("deviceauth request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("deviceauth returned unexpected status: {0}")]
    UnexpectedStatus(StatusCode),
}

/// Activates or deactivates the credentials of a device in deviceauth.
#[async_trait]
pub trait DevAuthClient: Send + Sync {
    async fn update_status(
        &self,
        device: &Device,
        status: DeviceStatus,
    ) -> Result<(), DevAuthError>;

    async fn activate(&self, device: &Device) -> Result<(), DevAuthError> {
        self.update_status(device, DeviceStatus::Accepted).await
    }

    async fn deactivate(&self, device: &Device) -> Result<(), DevAuthError> {
        self.update_status(device, DeviceStatus::Rejected).await
    }
}

/// Yields a fresh client on every call, nothing is cached between calls.
pub type ClientFactory = Arc<dyn Fn() -> Box<dyn DevAuthClient> + Send + Sync>;

pub fn http_client_factory(config: ClientConfig) -> ClientFactory {
    let config = Arc::new(config);
    Arc::new(move || Box::new(DevAuthHttpClient::new(config.clone())) as Box<dyn DevAuthClient>)
}

#[derive(Serialize)]
struct StatusBody {
    status: DeviceStatus,
}

pub struct DevAuthHttpClient {
    config: Arc<ClientConfig>,
}

impl DevAuthHttpClient {
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    /// `{endpoint}/api/0.1.0/devices/{device_id}/auth/{auth_id}/status`
    fn status_url(&self, device: &Device) -> Result<Url, DevAuthError> {
        let invalid = || DevAuthError::InvalidEndpoint(self.config.endpoint.clone());
        let mut url = Url::parse(&self.config.endpoint).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend([
                "api",
                "0.1.0",
                "devices",
                device.device_id.as_str(),
                "auth",
                device.id.as_str(),
                "status",
            ]);
        Ok(url)
    }
}

#[async_trait]
impl DevAuthClient for DevAuthHttpClient {
    async fn update_status(
        &self,
        device: &Device,
        status: DeviceStatus,
    ) -> Result<(), DevAuthError> {
        let url = self.status_url(device)?;
        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()?;
        let mut attempt = 0;
        loop {
            let result = client
                .put(url.clone())
                .json(&StatusBody { status })
                .send()
                .await;
            let retryable = match &result {
                Ok(res) => res.status().is_server_error(),
                Err(err) => err.is_connect() || err.is_timeout(),
            };
            if retryable && attempt < self.config.max_retries {
                attempt += 1;
                tracing::warn!(
                    auth_id = %device.id,
                    attempt,
                    "deviceauth status update failed, retrying"
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                continue;
            }
            let res = result?;
            return match res.status() {
                StatusCode::NO_CONTENT => {
                    tracing::debug!(auth_id = %device.id, %status, "deviceauth status updated");
                    Ok(())
                }
                code => Err(DevAuthError::UnexpectedStatus(code)),
            };
        }
    }
}
