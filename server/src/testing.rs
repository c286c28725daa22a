//! Shared fixtures for the unit tests

use crate::client::deviceauth::DevAuthClient;
use crate::client::{ClientFactory, DevAuthError};
use crate::models::{AuthId, Device, DeviceStatus};
use crate::services::AdmissionCoordinator;
use crate::store::{DeviceStore, SqliteDeviceStore, StoreError, TenantProvisioner};
use async_trait::async_trait;
use reqwest::StatusCode;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) async fn memory_store() -> SqliteDeviceStore {
    // a single connection, every new connection would open its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteDeviceStore::new(pool);
    store.migrate().await.unwrap();
    store
}

/// Provisioner rooted in a fresh directory under the system temp dir
pub(crate) fn temp_tenants() -> TenantProvisioner {
    TenantProvisioner::new(
        std::env::temp_dir().join(format!("deviceadm-tenants-{}", uuid::Uuid::new_v4())),
    )
}

#[derive(Default)]
pub(crate) struct StubStore {
    devices: Mutex<Vec<Device>>,
    read_failure: Mutex<Option<String>>,
    write_failure: Mutex<Option<String>>,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl StubStore {
    pub fn seeded(devices: impl IntoIterator<Item = Device>) -> Arc<Self> {
        Arc::new(Self {
            devices: Mutex::new(devices.into_iter().collect()),
            ..Default::default()
        })
    }

    pub fn broken(message: &str) -> Arc<Self> {
        let store = Self::seeded([]);
        *store.read_failure.lock().unwrap() = Some(message.to_string());
        store.fail_writes(message);
        store
    }

    pub fn fail_writes(&self, message: &str) {
        *self.write_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn status_of(&self, id: &str) -> Option<DeviceStatus> {
        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|it| it.id.as_str() == id)
            .map(|it| it.status)
    }

    fn check(failure: &Mutex<Option<String>>) -> Result<(), StoreError> {
        match failure.lock().unwrap().as_ref() {
            Some(message) => Err(StoreError::Other(anyhow::anyhow!("{message}"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DeviceStore for StubStore {
    async fn get_devices(
        &self,
        skip: u64,
        limit: u64,
        status: Option<DeviceStatus>,
    ) -> Result<Vec<Device>, StoreError> {
        Self::check(&self.read_failure)?;
        Ok(self
            .devices
            .lock()
            .unwrap()
            .iter()
            .filter(|it| status.is_none_or(|status| it.status == status))
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_device(&self, id: &AuthId) -> Result<Device, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.read_failure)?;
        self.devices
            .lock()
            .unwrap()
            .iter()
            .find(|it| &it.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn put_device(&self, device: &Device) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.write_failure)?;
        let mut devices = self.devices.lock().unwrap();
        match devices.iter_mut().find(|it| it.id == device.id) {
            Some(existing) => *existing = device.clone(),
            None => devices.push(device.clone()),
        }
        Ok(())
    }

    async fn delete_device(&self, id: &AuthId) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.write_failure)?;
        let mut devices = self.devices.lock().unwrap();
        let len = devices.len();
        devices.retain(|it| &it.id != id);
        if devices.len() == len {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Deviceauth double, records every status update it receives
#[derive(Default)]
pub(crate) struct StubClient {
    fail: bool,
    observe: Option<Arc<StubStore>>,
    pub calls: AtomicUsize,
    requests: Mutex<Vec<(String, DeviceStatus)>>,
    observed: Mutex<Vec<DeviceStatus>>,
}

impl StubClient {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Records the stored status of the device at the moment deviceauth is notified
    pub fn observing(store: Arc<StubStore>) -> Self {
        Self {
            observe: Some(store),
            ..Default::default()
        }
    }

    pub fn statuses(&self) -> Vec<(String, DeviceStatus)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn observed(&self) -> Vec<DeviceStatus> {
        self.observed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DevAuthClient for Arc<StubClient> {
    async fn update_status(
        &self,
        device: &Device,
        status: DeviceStatus,
    ) -> Result<(), DevAuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(store) = &self.observe {
            if let Some(current) = store.status_of(device.id.as_str()) {
                self.observed.lock().unwrap().push(current);
            }
        }
        if self.fail {
            return Err(DevAuthError::UnexpectedStatus(
                StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        self.requests
            .lock()
            .unwrap()
            .push((device.id.to_string(), status));
        Ok(())
    }
}

pub(crate) fn stub_factory(client: Arc<StubClient>) -> ClientFactory {
    Arc::new(move || Box::new(client.clone()) as Box<dyn DevAuthClient>)
}

pub(crate) fn stub_coordinator(
    store: Arc<impl DeviceStore + 'static>,
    client: StubClient,
) -> (AdmissionCoordinator, Arc<StubClient>) {
    let client = Arc::new(client);
    let admission = AdmissionCoordinator::with_factory(store, stub_factory(client.clone()));
    (admission, client)
}
