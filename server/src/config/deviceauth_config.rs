use crate::client::ClientConfig;
use serde::Deserialize;
use std::time::Duration;

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Deserialize, Debug, Clone)]
pub struct DevAuthConfig {
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl From<&DevAuthConfig> for ClientConfig {
    fn from(value: &DevAuthConfig) -> Self {
        Self {
            endpoint: value.endpoint.clone(),
            timeout: Duration::from_secs(value.timeout_secs),
            max_retries: value.max_retries,
        }
    }
}
