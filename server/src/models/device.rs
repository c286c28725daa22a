use crate::utils::option_serialize_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Identifier of a single authentication request submitted by a device.
///
/// One device may own several of these over time, e.g. after a key rotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct AuthId(String);

/// Identifier of the physical device, stable across authentication requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct DeviceId(String);

macro_rules! impl_identifier {
    ($name: ident) => {
        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }
        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

impl_identifier!(AuthId);
impl_identifier!(DeviceId);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Pending => "pending",
            DeviceStatus::Accepted => "accepted",
            DeviceStatus::Rejected => "rejected",
        }
    }
}

impl Display for DeviceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported device status '{0}'")]
pub struct ParseStatusError(String);

impl FromStr for DeviceStatus {
    type Err = ParseStatusError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeviceStatus::Pending),
            "accepted" => Ok(DeviceStatus::Accepted),
            "rejected" => Ok(DeviceStatus::Rejected),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Admission record of a device authentication request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Device {
    pub id: AuthId,
    pub device_id: DeviceId,
    /// device public key, opaque to the admission logic
    #[sqlx(rename = "pubkey")]
    pub key: String,
    /// raw identity data reported by the device
    pub device_identity: String,
    pub status: DeviceStatus,
    #[serde(serialize_with = "option_serialize_rfc3339")]
    pub request_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
impl Device {
    pub fn new(id: impl Into<AuthId>, device_id: impl Into<DeviceId>) -> Self {
        Self {
            id: id.into(),
            device_id: device_id.into(),
            key: String::new(),
            device_identity: String::new(),
            status: DeviceStatus::Pending,
            request_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        for status in [
            DeviceStatus::Pending,
            DeviceStatus::Accepted,
            DeviceStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<DeviceStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status)
            );
        }
        assert!("Accepted".parse::<DeviceStatus>().is_err());
        assert!("".parse::<DeviceStatus>().is_err());
        assert!(serde_json::from_str::<DeviceStatus>("\"bogus\"").is_err());
    }

    #[test]
    fn test_empty_identifier() {
        assert!(AuthId::from("").is_empty());
        assert!(AuthId::from("  ").is_empty());
        assert!(!AuthId::from("foo").is_empty());
    }

    #[test]
    fn test_serialize_device() {
        let mut device = Device::new("foo", "bar");
        device.request_time = DateTime::from_timestamp(0, 0);
        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["id"], "foo");
        assert_eq!(value["device_id"], "bar");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["request_time"], "1970-01-01T00:00:00+00:00");
    }
}
