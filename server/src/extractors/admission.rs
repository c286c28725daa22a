use crate::middlewares::request_id::RequestId;
use crate::services::{RequestContext, ScopedCoordinator};
use crate::state::AppState;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use std::convert::Infallible;
use std::ops::Deref;
use tracing::Span;

/// Admission coordinator bound to the span of the current request
pub struct Admission(pub ScopedCoordinator);

impl<S> FromRequestParts<S> for Admission
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let ctx = RequestContext {
            request_id: parts.extensions.get::<RequestId>().cloned(),
            span: Some(Span::current()),
        };
        Ok(Self(state.admission.with_context(ctx)))
    }
}

impl Deref for Admission {
    type Target = ScopedCoordinator;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
