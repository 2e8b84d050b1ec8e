//! Error boundary for every endpoint
//!
//! Degraded responses never reach this module; they are successes with a
//! note. What lands here is a hard failure: full detail goes to the log, the
//! caller gets a fixed-shape body with a generic message.

use axum::{
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::any::Any;

#[derive(Debug)]
pub enum ApiError {
    /// Unexpected fault; `message` is what the caller sees.
    Internal {
        message: &'static str,
        source: anyhow::Error,
    },
    NotFound {
        method: Method,
        path: String,
    },
}

impl ApiError {
    pub fn internal(message: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message,
            source: source.into(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            Self::Internal { message, source } => {
                tracing::error!(error = ?source, "{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
            Self::NotFound { method, path } => {
                tracing::info!("404 - Not found: {} {}", method, path);
                (
                    StatusCode::NOT_FOUND,
                    format!("Endpoint {} {} not found", method, path),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": { "code": code, "message": message }
        }));
        (status, body).into_response()
    }
}

/// Fallback handler for unmatched routes.
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound {
        method,
        path: uri.path().to_string(),
    }
}

/// Response for a panic caught inside a handler.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::internal("Internal server error", anyhow::anyhow!("handler panicked: {}", detail)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let err = ApiError::internal(
            "Failed to retrieve incidents",
            anyhow::anyhow!("password authentication failed for user emergency_user"),
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "Failed to retrieve incidents");
        assert!(!body.to_string().contains("emergency_user"));
    }

    async fn exploding_handler() -> &'static str {
        panic!("index out of bounds: the len is 0 but the index is 3")
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let app = Router::new()
            .route("/boom", get(exploding_handler))
            .layer(CatchPanicLayer::custom(panic_response));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response.into_response()).await;
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("index out of bounds"));
    }

    #[tokio::test]
    async fn test_not_found_shape() {
        let app = Router::new().fallback(not_found);
        let response = app
            .oneshot(Request::builder().method("DELETE").uri("/api/v1/nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "Endpoint DELETE /api/v1/nothing not found");
    }
}
