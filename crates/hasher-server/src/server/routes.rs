//! HTTP routes for the digest service.
//!
//! ## Routes
//!
//! - `POST /hash` - submit the form field `password`; responds with the handle.
//! - `GET /hash/{key}` - the base64 SHA-512 digest for a handle, once ready.
//! - `GET /stats` - `{"Total": n, "Average": ms}` over completed digests.
//! - `GET|POST /shutdown` - stop accepting work and drain.
//!
//! Every other path answers `404` for `GET`/`POST` and `405` for any other
//! method, including known paths requested with the wrong method.

use crate::server::{error::ApiError, telemetry};
use axum::{
    Form, Router,
    body::Body,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{Method, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use core::convert::Infallible;
use hasher::{Pipeline, WorkHandle};
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Builds the service router around a shared [`Pipeline`].
pub fn router(pipeline: Pipeline) -> Router {
    // `get` also answers HEAD unless a HEAD handler is set explicitly.
    Router::new()
        .route("/hash", post(submit).fallback(fallback))
        .route("/hash/{key}", get(fetch).head(fallback).fallback(fallback))
        .route("/stats", get(stats).head(fallback).fallback(fallback))
        .route(
            "/shutdown",
            get(shutdown)
                .post(shutdown)
                .head(fallback)
                .fallback(fallback),
        )
        .fallback(fallback)
        .with_state(pipeline)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(track_requests)),
        )
}

const PASSWORD_FIELD: &str = "password";

/// The first `password` value of a urlencoded or multipart form body.
///
/// Never rejects: a missing field or an unreadable body yields an empty
/// password, so the pipeline's admission check still runs before validation.
#[derive(Debug, Default)]
struct Password(String);

impl<S> FromRequest<S> for Password
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        let password = if multipart {
            multipart_password(req, state).await
        } else {
            urlencoded_password(req, state).await
        };
        Ok(Self(password.unwrap_or_default()))
    }
}

async fn urlencoded_password<S>(req: Request, state: &S) -> Option<String>
where
    S: Send + Sync,
{
    let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
        .await
        .ok()?;
    pairs
        .into_iter()
        .find_map(|(name, value)| (name == PASSWORD_FIELD).then_some(value))
}

async fn multipart_password<S>(req: Request, state: &S) -> Option<String>
where
    S: Send + Sync,
{
    let mut multipart = Multipart::from_request(req, state).await.ok()?;
    while let Some(field) = multipart.next_field().await.ok()? {
        // File parts are not form values.
        if field.name() == Some(PASSWORD_FIELD) && field.file_name().is_none() {
            return field.text().await.ok();
        }
    }
    None
}

/// Accepts a password for digesting.
#[tracing::instrument(skip_all)]
async fn submit(
    State(pipeline): State<Pipeline>,
    Password(password): Password,
) -> Result<String, ApiError> {

    match pipeline.submit(password) {
        Ok(handle) => {
            telemetry::increment_submissions();
            tracing::info!(%handle, "Accepted hash request");
            Ok(format!("{handle}\n"))
        }
        Err(e) => {
            if matches!(e, hasher::Error::Rejected) {
                telemetry::increment_rejected();
            } else {
                telemetry::increment_invalid();
            }
            Err(e.into())
        }
    }
}

#[tracing::instrument(skip_all, fields(key = %key))]
async fn fetch(
    State(pipeline): State<Pipeline>,
    Path(key): Path<String>,
    uri: Uri,
) -> Result<String, ApiError> {
    // Only plain digit strings are handle paths; anything else is an unknown
    // URL. Digit strings that overflow a handle are invalid keys.
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::UnknownPath {
            method: Method::GET,
            path: uri.path().to_string(),
        });
    }
    let handle: WorkHandle = key.parse().map_err(|_| ApiError::InvalidKey)?;

    match pipeline.fetch(handle) {
        Ok(digest) => Ok(format!("{digest}\n")),
        Err(e) => {
            telemetry::increment_fetch_misses();
            Err(e.into())
        }
    }
}

async fn stats(State(pipeline): State<Pipeline>) -> Result<Response, ApiError> {
    let report = pipeline.stats().report();
    let body = serde_json::to_vec(&report).map_err(|e| hasher::Error::Internal {
        context: e.to_string(),
    })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn shutdown(State(pipeline): State<Pipeline>) -> &'static str {
    if pipeline.request_shutdown() {
        tracing::info!(
            in_flight = pipeline.gate().in_flight(),
            "Shutdown requested over HTTP"
        );
    }
    "shutdown sequence initiated\n"
}

async fn fallback(method: Method, uri: Uri) -> ApiError {
    if method == Method::GET || method == Method::POST {
        ApiError::UnknownPath {
            method,
            path: uri.path().to_string(),
        }
    } else {
        ApiError::MethodNotAllowed { method }
    }
}

async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    telemetry::increment_requests();
    telemetry::record_request_duration(start.elapsed().as_secs_f64() * 1_000.0);
    response
}
