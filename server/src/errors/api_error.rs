use crate::services::AdmissionError;
use crate::store::TenantError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ApiError {
    ResourceNotFound,
    BadRequest(String),
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::ResourceNotFound => f.write_str("Resource not found"),
            ApiError::BadRequest(message) => f.write_str(message),
            ApiError::Internal(_) => f.write_str("internal error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status = match &self {
            ApiError::ResourceNotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => {
                tracing::warn!("{}", message);
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(err) => {
                tracing::error!("{}", err);
                err.chain()
                    .skip(1)
                    .for_each(|cause| tracing::error!("Because: {}", cause));
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<AdmissionError> for ApiError {
    fn from(value: AdmissionError) -> Self {
        match value {
            AdmissionError::DeviceNotFound => Self::ResourceNotFound,
            AdmissionError::Validation(_) => Self::BadRequest(value.to_string()),
            err => Self::Internal(err.into()),
        }
    }
}

impl From<TenantError> for ApiError {
    fn from(value: TenantError) -> Self {
        match value {
            TenantError::Validation(_) => Self::BadRequest(value.to_string()),
            err => Self::Internal(err.into()),
        }
    }
}
