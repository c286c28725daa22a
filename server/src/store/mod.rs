mod sqlite;
mod tenants;

pub use sqlite::SqliteDeviceStore;
pub use tenants::{TenantError, TenantProvisioner};

use crate::models::{AuthId, Device, DeviceStatus};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("device not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        Self::Other(value.into())
    }
}

/// Persistence of device admission records, keyed by [`AuthId`].
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Lists records in store order. `None` matches every status.
    async fn get_devices(
        &self,
        skip: u64,
        limit: u64,
        status: Option<DeviceStatus>,
    ) -> Result<Vec<Device>, StoreError>;

    async fn get_device(&self, id: &AuthId) -> Result<Device, StoreError>;

    /// Inserts the record or replaces the one with the same [`AuthId`].
    async fn put_device(&self, device: &Device) -> Result<(), StoreError>;

    async fn delete_device(&self, id: &AuthId) -> Result<(), StoreError>;
}
