use crate::middlewares::request_id::RequestId;
use crate::models::{AuthId, Device, DeviceStatus};
use crate::services::admission::{AdmissionCoordinator, AdmissionError, DeviceAdmission};
use async_trait::async_trait;
use tracing::{Instrument, Span};

/// Diagnostics context captured from the calling request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: Option<RequestId>,
    pub span: Option<Span>,
}

/// Binds an [`AdmissionCoordinator`] to the span of one request.
///
/// Every call is forwarded unchanged and runs inside the bound span, so events from the
/// coordinator, the store and the deviceauth client carry the request's correlation id.
pub struct ScopedCoordinator {
    inner: AdmissionCoordinator,
    span: Span,
}

impl ScopedCoordinator {
    pub fn new(inner: AdmissionCoordinator, ctx: RequestContext) -> Self {
        let span = match (ctx.span, ctx.request_id) {
            (Some(span), _) => span,
            (None, Some(request_id)) => {
                tracing::info_span!("admission", request_id = %request_id)
            }
            (None, None) => Span::none(),
        };
        Self { inner, span }
    }

    #[cfg(test)]
    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[async_trait]
impl DeviceAdmission for ScopedCoordinator {
    async fn list_devices(
        &self,
        skip: u64,
        limit: u64,
        status: Option<DeviceStatus>,
    ) -> Result<Vec<Device>, AdmissionError> {
        self.inner
            .list_devices(skip, limit, status)
            .instrument(self.span.clone())
            .await
    }

    async fn get_device(&self, id: &AuthId) -> Result<Device, AdmissionError> {
        self.inner
            .get_device(id)
            .instrument(self.span.clone())
            .await
    }

    async fn submit_device(&self, device: Device) -> Result<(), AdmissionError> {
        self.inner
            .submit_device(device)
            .instrument(self.span.clone())
            .await
    }

    async fn accept_device(&self, id: &AuthId) -> Result<(), AdmissionError> {
        self.inner
            .accept_device(id)
            .instrument(self.span.clone())
            .await
    }

    async fn reject_device(&self, id: &AuthId) -> Result<(), AdmissionError> {
        self.inner
            .reject_device(id)
            .instrument(self.span.clone())
            .await
    }

    async fn delete_device(&self, id: &AuthId) -> Result<(), AdmissionError> {
        self.inner
            .delete_device(id)
            .instrument(self.span.clone())
            .await
    }
}
