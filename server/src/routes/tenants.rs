use crate::errors::{ApiError, ApiResult};
use crate::models::dtos::tenant::NewTenantBodyDto;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

/// Provisions the database of a tenant, repeating the call is harmless
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewTenantBodyDto>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(body) = body.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    state.tenants.provision(&body.tenant_id).await?;
    Ok(StatusCode::CREATED)
}
