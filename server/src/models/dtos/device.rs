use crate::models::{AuthId, Device, DeviceId, DeviceStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct DeviceListQueryDto {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// empty string matches every status
    pub status: Option<String>,
}

/// Body posted by deviceauth when a device submits an authentication request
#[derive(Debug, Deserialize)]
pub struct SubmitDeviceBodyDto {
    pub id: String,
    pub device_id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub device_identity: String,
}

impl SubmitDeviceBodyDto {
    pub fn into_device(self, request_time: DateTime<Utc>) -> Device {
        Device {
            id: AuthId::from(self.id),
            device_id: DeviceId::from(self.device_id),
            key: self.key,
            device_identity: self.device_identity,
            status: DeviceStatus::Pending,
            request_time: Some(request_time),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusBodyDto {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponseDto {
    pub status: DeviceStatus,
}
