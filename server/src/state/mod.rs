use crate::client::ClientConfig;
use crate::config::Config;
use crate::services::AdmissionCoordinator;
use crate::store::{SqliteDeviceStore, TenantProvisioner};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub admission: AdmissionCoordinator,
    pub tenants: Arc<TenantProvisioner>,
}

impl AppState {
    pub fn new(admission: AdmissionCoordinator, tenants: TenantProvisioner) -> Self {
        Self {
            admission,
            tenants: Arc::new(tenants),
        }
    }

    pub async fn build(config: &Config) -> anyhow::Result<Self> {
        let store = SqliteDeviceStore::connect(&config.database).await?;
        let admission =
            AdmissionCoordinator::new(Arc::new(store), ClientConfig::from(&config.deviceauth));
        let tenants = TenantProvisioner::new(config.database.tenants_dir());
        Ok(Self::new(admission, tenants))
    }
}
