use crate::client::deviceauth::http_client_factory;
use crate::client::{ClientConfig, ClientFactory, DevAuthError};
use crate::models::{AuthId, Device, DeviceStatus};
use crate::services::scoped::{RequestContext, ScopedCoordinator};
use crate::store::{DeviceStore, StoreError};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("device not found")]
    DeviceNotFound,
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("failed to propagate device status to deviceauth: {0}")]
    RemoteNotification(#[source] DevAuthError),
    #[error("failed to {action} device: {source}")]
    Persistence {
        action: &'static str,
        source: StoreError,
    },
    #[error(transparent)]
    Store(StoreError),
}

impl AdmissionError {
    /// Not-found becomes [`AdmissionError::DeviceNotFound`], anything else passes through.
    fn from_lookup(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::DeviceNotFound,
            err => Self::Store(err),
        }
    }

    fn persistence(action: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Persistence { action, source }
    }
}

/// Admission operations, shared by the coordinator and its request-scoped wrapper.
#[async_trait]
pub trait DeviceAdmission: Send + Sync {
    async fn list_devices(
        &self,
        skip: u64,
        limit: u64,
        status: Option<DeviceStatus>,
    ) -> Result<Vec<Device>, AdmissionError>;

    async fn get_device(&self, id: &AuthId) -> Result<Device, AdmissionError>;

    async fn submit_device(&self, device: Device) -> Result<(), AdmissionError>;

    async fn accept_device(&self, id: &AuthId) -> Result<(), AdmissionError>;

    async fn reject_device(&self, id: &AuthId) -> Result<(), AdmissionError>;

    async fn delete_device(&self, id: &AuthId) -> Result<(), AdmissionError>;
}

#[derive(Debug, Clone, Copy)]
enum Decision {
    Accept,
    Reject,
}

impl Decision {
    fn status(self) -> DeviceStatus {
        match self {
            Decision::Accept => DeviceStatus::Accepted,
            Decision::Reject => DeviceStatus::Rejected,
        }
    }
}

/// Pairs device store writes with deviceauth notifications.
///
/// Holds no state besides the injected store and client factory, clones are cheap
/// and may be used concurrently. Concurrent decisions on the same device are not
/// serialized, the last store write wins.
#[derive(Clone)]
pub struct AdmissionCoordinator {
    store: Arc<dyn DeviceStore>,
    client_factory: ClientFactory,
}

impl AdmissionCoordinator {
    pub fn new(store: Arc<dyn DeviceStore>, config: ClientConfig) -> Self {
        Self::with_factory(store, http_client_factory(config))
    }

    pub fn with_factory(store: Arc<dyn DeviceStore>, client_factory: ClientFactory) -> Self {
        Self {
            store,
            client_factory,
        }
    }

    pub fn with_context(&self, ctx: RequestContext) -> ScopedCoordinator {
        ScopedCoordinator::new(self.clone(), ctx)
    }

    /// Read, notify deviceauth, then persist.
    ///
    /// The store write only happens once deviceauth confirmed the change, a failed
    /// notification leaves the record untouched. A failed store write after a
    /// successful notification is reported but not compensated.
    async fn decide(&self, id: &AuthId, decision: Decision) -> Result<(), AdmissionError> {
        ensure_auth_id(id)?;
        let mut device = self
            .store
            .get_device(id)
            .await
            .map_err(AdmissionError::from_lookup)?;

        let client = (self.client_factory)();
        let notified = match decision {
            Decision::Accept => client.activate(&device).await,
            Decision::Reject => client.deactivate(&device).await,
        };
        if let Err(err) = notified {
            tracing::warn!(auth_id = %id, ?decision, "deviceauth notification failed: {err}");
            return Err(AdmissionError::RemoteNotification(err));
        }

        device.status = decision.status();
        self.store
            .put_device(&device)
            .await
            .map_err(AdmissionError::persistence("put"))?;
        tracing::info!(auth_id = %id, device_id = %device.device_id, status = %device.status, "device status updated");
        Ok(())
    }
}

fn ensure_auth_id(id: &AuthId) -> Result<(), AdmissionError> {
    if id.is_empty() {
        return Err(AdmissionError::Validation(
            "device auth ID must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl DeviceAdmission for AdmissionCoordinator {
    async fn list_devices(
        &self,
        skip: u64,
        limit: u64,
        status: Option<DeviceStatus>,
    ) -> Result<Vec<Device>, AdmissionError> {
        tracing::debug!(skip, limit, ?status, "listing devices");
        self.store
            .get_devices(skip, limit, status)
            .await
            .map_err(AdmissionError::Store)
    }

    async fn get_device(&self, id: &AuthId) -> Result<Device, AdmissionError> {
        ensure_auth_id(id)?;
        self.store
            .get_device(id)
            .await
            .map_err(AdmissionError::from_lookup)
    }

    async fn submit_device(&self, mut device: Device) -> Result<(), AdmissionError> {
        ensure_auth_id(&device.id)?;
        device.status = DeviceStatus::Pending;
        self.store
            .put_device(&device)
            .await
            .map_err(AdmissionError::persistence("put"))?;
        tracing::info!(auth_id = %device.id, device_id = %device.device_id, "device submitted");
        Ok(())
    }

    async fn accept_device(&self, id: &AuthId) -> Result<(), AdmissionError> {
        tracing::debug!(auth_id = %id, "accepting device");
        self.decide(id, Decision::Accept).await
    }

    async fn reject_device(&self, id: &AuthId) -> Result<(), AdmissionError> {
        tracing::debug!(auth_id = %id, "rejecting device");
        self.decide(id, Decision::Reject).await
    }

    async fn delete_device(&self, id: &AuthId) -> Result<(), AdmissionError> {
        ensure_auth_id(id)?;
        match self.store.delete_device(id).await {
            Ok(()) => {
                tracing::info!(auth_id = %id, "device deleted");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AdmissionError::DeviceNotFound),
            Err(err) => Err(AdmissionError::persistence("delete")(err)),
        }
    }
}
