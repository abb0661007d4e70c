//! HTTP API for the bounded application
//!
//! Routes:
//! - `GET /version` - build metadata
//! - `GET /hello` - liveness greeting
//! - `GET /healthz` - plain-text health check
//!
//! Every JSON response is logged with method, path, status and latency.

use std::time::Instant;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Build version, set at compile time through `BUILD_VERSION`
pub const VERSION: &str = match option_env!("BUILD_VERSION") {
    Some(version) => version,
    None => "SNAPSHOT",
};

/// Commit hash, set at compile time through `BUILD_HASH`
pub const BUILD_HASH: &str = match option_env!("BUILD_HASH") {
    Some(hash) => hash,
    None => "AAAAAAAA",
};

/// Build date, set at compile time through `BUILD_DATE`
pub const BUILD_DATE: &str = match option_env!("BUILD_DATE") {
    Some(date) => date,
    None => "19760101",
};

/// Errors starting or running the server
#[derive(Debug, Error)]
pub enum ApiError {
    /// The listen address could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an error
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// Logging could not be initialized
    #[error(transparent)]
    Telemetry(#[from] boundary_common::telemetry::TelemetryError),
}

/// `GET /version` body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    /// Release version
    pub version: String,
    /// Commit hash
    pub buildhash: String,
    /// Build date (YYYYMMDD)
    pub builddate: String,
}

impl VersionResponse {
    /// Metadata of this build
    pub fn current() -> Self {
        Self {
            version: VERSION.to_string(),
            buildhash: BUILD_HASH.to_string(),
            builddate: BUILD_DATE.to_string(),
        }
    }
}

/// `GET /hello` body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloResponse {
    /// HTTP status echoed in the body
    pub status: u16,
    /// Greeting
    pub message: String,
}

/// Body of error responses
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// User-level status text
    pub status: String,
    /// Detail for debugging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build the API router
pub fn router() -> Router {
    Router::new()
        .route("/version", get(version_handler))
        .route("/hello", get(hello_handler))
        .route("/healthz", get(|| async { "ok" }))
        .fallback(not_found_handler)
        .layer(middleware::from_fn(log_request))
}

async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse::current())
}

async fn hello_handler() -> Json<HelloResponse> {
    debug!("hello requested");
    Json(HelloResponse {
        status: StatusCode::OK.as_u16(),
        message: "hello world".to_string(),
    })
}

async fn not_found_handler(request: Request) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            status: "Resource not found.".to_string(),
            error: Some(format!("no route for {}", request.uri().path())),
        }),
    )
        .into_response()
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
    response
}

/// Serve [`router`] on `addr` until the process is stopped
pub async fn serve(addr: &str) -> Result<(), ApiError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ApiError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!(addr = %addr, version = VERSION, "API listening");
    axum::serve(listener, router())
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutting down"),
                // Without a handler keep serving until killed
                Err(_) => std::future::pending().await,
            }
        })
        .await
        .map_err(ApiError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    async fn get(uri: &str) -> Response {
        router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn version_reports_build_metadata() {
        let response = get("/version").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body: VersionResponse = body_json(response).await;
        assert_eq!(body, VersionResponse::current());
    }

    #[test]
    fn version_defaults_without_build_env() {
        if option_env!("BUILD_VERSION").is_none() {
            assert_eq!(VERSION, "SNAPSHOT");
        }
        if option_env!("BUILD_HASH").is_none() {
            assert_eq!(BUILD_HASH, "AAAAAAAA");
        }
        if option_env!("BUILD_DATE").is_none() {
            assert_eq!(BUILD_DATE, "19760101");
        }
    }

    #[tokio::test]
    async fn hello_world() {
        let response = get("/hello").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({ "status": 200, "message": "hello world" })
        );
    }

    #[tokio::test]
    async fn healthz_is_plain_ok() {
        let response = get("/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let response = get("/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.status, "Resource not found.");
        assert_eq!(body.error.as_deref(), Some("no route for /nope"));
    }

    #[tokio::test]
    async fn post_to_hello_is_rejected() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/hello")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
