use crate::errors::{ApiError, ApiResult};
use crate::extractors::Admission;
use crate::models::dtos::device::{
    DEFAULT_PER_PAGE, DeviceListQueryDto, MAX_PER_PAGE, StatusBodyDto, StatusResponseDto,
    SubmitDeviceBodyDto,
};
use crate::models::{AuthId, DeviceStatus};
use crate::services::DeviceAdmission;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;

const DEVICES_PATH: &str = "/api/0.1.0/devices";

/// `Link` header with first/prev/next pages, next is only present when more records exist
fn pagination_links(
    page: u64,
    per_page: u64,
    status: Option<DeviceStatus>,
    has_next: bool,
) -> String {
    let status = status
        .map(|it| format!("&status={it}"))
        .unwrap_or_default();
    let link = |page: u64, rel: &str| {
        format!("<{DEVICES_PATH}?page={page}&per_page={per_page}{status}>; rel=\"{rel}\"")
    };
    let mut links = vec![link(1, "first")];
    if page > 1 {
        links.push(link(page - 1, "prev"));
    }
    if has_next {
        links.push(link(page + 1, "next"));
    }
    links.join(", ")
}

fn parse_status(status: &str) -> ApiResult<DeviceStatus> {
    status
        .parse::<DeviceStatus>()
        .map_err(|err| ApiError::BadRequest(err.to_string()))
}

/// Lists devices page by page, `Link` points at the neighbouring pages
pub async fn list(
    admission: Admission,
    query: Result<Query<DeviceListQueryDto>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if page == 0 {
        return Err(ApiError::BadRequest(
            "'page' must be a positive integer".to_string(),
        ));
    }
    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(ApiError::BadRequest(format!(
            "'per_page' must be between 1 and {MAX_PER_PAGE}"
        )));
    }
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(status) => Some(parse_status(status)?),
    };
    let skip = (page - 1).saturating_mul(per_page);
    // one extra record tells whether a next page exists
    let mut devices = admission.list_devices(skip, per_page + 1, status).await?;
    let has_next = devices.len() as u64 > per_page;
    devices.truncate(per_page as usize);
    Ok((
        [(header::LINK, pagination_links(page, per_page, status, has_next))],
        Json(devices),
    ))
}

pub async fn get(admission: Admission, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let device = admission.get_device(&AuthId::from(id)).await?;
    Ok(Json(device))
}

pub async fn delete(admission: Admission, Path(id): Path<String>) -> ApiResult<StatusCode> {
    admission.delete_device(&AuthId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_status(
    admission: Admission,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponseDto>> {
    let device = admission.get_device(&AuthId::from(id)).await?;
    Ok(Json(StatusResponseDto {
        status: device.status,
    }))
}

/// Accepts or rejects a device, `pending` is not a decision
pub async fn update_status(
    admission: Admission,
    Path(id): Path<String>,
    body: Result<Json<StatusBodyDto>, JsonRejection>,
) -> ApiResult<Json<StatusResponseDto>> {
    let Json(body) = body.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let id = AuthId::from(id);
    let status = parse_status(&body.status)?;
    match status {
        DeviceStatus::Accepted => admission.accept_device(&id).await?,
        DeviceStatus::Rejected => admission.reject_device(&id).await?,
        DeviceStatus::Pending => {
            return Err(ApiError::BadRequest(format!(
                "unsupported device status '{status}'"
            )));
        }
    }
    Ok(Json(StatusResponseDto { status }))
}

/// Called by deviceauth for every new authentication request
pub async fn submit(
    admission: Admission,
    body: Result<Json<SubmitDeviceBodyDto>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = body.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let device = body.into_device(chrono::Utc::now());
    let location = format!("{DEVICES_PATH}/{}", device.id);
    admission.submit_device(device).await?;
    Ok((StatusCode::CREATED, [(header::LOCATION, location)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Device;
    use crate::routes;
    use crate::state::AppState;
    use crate::store::DeviceStore;
    use crate::testing::{StubClient, memory_store, stub_coordinator, temp_tenants};
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    async fn app(devices: &[(&str, i64)], client: StubClient) -> (Router, Arc<StubClient>) {
        let store = memory_store().await;
        for (id, time) in devices {
            let mut device = Device::new(*id, format!("dev-{id}"));
            device.request_time = chrono::DateTime::from_timestamp(*time, 0);
            store.put_device(&device).await.unwrap();
        }
        let (admission, client) = stub_coordinator(Arc::new(store), client);
        (routes::build().with_state(AppState::new(admission, temp_tenants())), client)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let res = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, headers, json)
    }

    #[tokio::test]
    async fn test_submit_then_get() {
        let (app, client) = app(&[], StubClient::ok()).await;
        let (status, headers, _) = send(
            &app,
            Method::POST,
            "/api/0.1.0/devices",
            Some(serde_json::json!({
                "id": "auth-1",
                "device_id": "dev-1",
                "key": "pubkey",
                "device_identity": "{\"mac\":\"00:11\"}"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(headers[header::LOCATION], "/api/0.1.0/devices/auth-1");

        let (status, _, body) = send(&app, Method::GET, "/api/0.1.0/devices/auth-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["key"], "pubkey");
        assert!(body["request_time"].is_string());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_malformed_body() {
        let (app, _) = app(&[], StubClient::ok()).await;
        let (status, _, body) = send(
            &app,
            Method::POST,
            "/api/0.1.0/devices",
            Some(serde_json::json!({ "device_id": "dev-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/api/0.1.0/devices",
            Some(serde_json::json!({ "id": "", "device_id": "dev-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_paging() {
        let (app, _) = app(&[("a", 1), ("b", 2), ("c", 3)], StubClient::ok()).await;

        let (status, headers, body) =
            send(&app, Method::GET, "/api/0.1.0/devices?page=1&per_page=2", None).await;
        assert_eq!(status, StatusCode::OK);
        let ids = body
            .as_array()
            .unwrap()
            .iter()
            .map(|it| it["id"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
        let link = headers[header::LINK].to_str().unwrap();
        assert!(link.contains("page=2&per_page=2>; rel=\"next\""));
        assert!(!link.contains("rel=\"prev\""));

        let (_, headers, body) =
            send(&app, Method::GET, "/api/0.1.0/devices?page=2&per_page=2", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        let link = headers[header::LINK].to_str().unwrap();
        assert!(link.contains("rel=\"prev\""));
        assert!(!link.contains("rel=\"next\""));
    }

    #[tokio::test]
    async fn test_list_filter_and_bad_query() {
        let (app, _) = app(&[("a", 1), ("b", 2)], StubClient::ok()).await;
        let (status, _, _) = send(
            &app,
            Method::PUT,
            "/api/0.1.0/devices/b/status",
            Some(serde_json::json!({ "status": "accepted" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, _, body) = send(&app, Method::GET, "/api/0.1.0/devices?status=accepted", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], "b");
        let (_, _, body) = send(&app, Method::GET, "/api/0.1.0/devices?status=", None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        for uri in [
            "/api/0.1.0/devices?status=bogus",
            "/api/0.1.0/devices?page=0",
            "/api/0.1.0/devices?page=abc",
            "/api/0.1.0/devices?per_page=0",
            "/api/0.1.0/devices?per_page=501",
        ] {
            let (status, _, _) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_update_status() {
        let (app, client) = app(&[("foo", 1)], StubClient::ok()).await;
        let uri = "/api/0.1.0/devices/foo/status";

        let (status, _, body) = send(
            &app,
            Method::PUT,
            uri,
            Some(serde_json::json!({ "status": "rejected" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "rejected");
        let (_, _, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(body["status"], "rejected");

        for bad in ["pending", "bogus"] {
            let (status, _, _) = send(
                &app,
                Method::PUT,
                uri,
                Some(serde_json::json!({ "status": bad })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let (status, _, _) = send(
            &app,
            Method::PUT,
            "/api/0.1.0/devices/bar/status",
            Some(serde_json::json!({ "status": "accepted" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_status_remote_failure() {
        let (app, _) = app(&[("foo", 1)], StubClient::failing()).await;
        let (status, _, _) = send(
            &app,
            Method::PUT,
            "/api/0.1.0/devices/foo/status",
            Some(serde_json::json!({ "status": "accepted" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let (_, _, body) = send(&app, Method::GET, "/api/0.1.0/devices/foo/status", None).await;
        assert_eq!(body["status"], "pending");
    }

    #[tokio::test]
    async fn test_delete() {
        let (app, _) = app(&[("foo", 1)], StubClient::ok()).await;
        let (status, headers, _) = send(&app, Method::DELETE, "/api/0.1.0/devices/foo", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(headers.contains_key("x-men-requestid"));
        let (status, _, _) = send(&app, Method::DELETE, "/api/0.1.0/devices/foo", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = send(&app, Method::GET, "/api/0.1.0/devices/foo", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
