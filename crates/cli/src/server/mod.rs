//! HTTP gateway over the engine.

pub mod dto;
pub mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use vecgate_core::{AppError, AppResult};
use vecgate_engine::Gateway;

/// Upper bound on a whole request, embedding included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/documents", post(handlers::create_document))
        .route("/documents/bulk", post(handlers::bulk_create_documents))
        .route("/documents/search", post(handlers::search_documents))
        .route(
            "/documents/{id}",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .with_state(state)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve until Ctrl-C.
pub async fn run_server(gateway: Gateway, bind_address: &str) -> AppResult<()> {
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid bind address '{}': {}", bind_address, e)))?;

    let app = app_router(AppState {
        gateway: Arc::new(gateway),
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("vecgate listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
            }
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use vecgate_core::AppConfig;

    async fn router() -> Router {
        let mut config = AppConfig::default();
        config.store.backend = "memory".to_string();
        config.vector.dimension = 128;
        config.vector.max_results = 5;

        let gateway = Gateway::from_config(&config).await.unwrap();
        app_router(AppState {
            gateway: Arc::new(gateway),
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let app = router().await;

        let (status, created) = send(
            &app,
            post_json("/documents", json!({"content": "hello world", "metadata": {"a": 1}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created.get("embedding").is_none());
        let id = created["id"].as_str().unwrap().to_string();

        let (status, fetched) = send(&app, request("GET", &format!("/documents/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["content"], "hello world");
        assert_eq!(fetched["metadata"]["a"], 1);

        let (status, _) = send(&app, request("DELETE", &format!("/documents/{}", id))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, request("DELETE", &format!("/documents/{}", id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_empty_content_is_bad_request() {
        let app = router().await;
        let (status, body) = send(&app, post_json("/documents", json!({"content": "  "}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_non_object_metadata_is_bad_request() {
        let app = router().await;
        let (status, body) = send(
            &app,
            post_json("/documents", json!({"content": "x", "metadata": [1, 2]})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = router().await;
        let (status, body) = send(&app, post_json("/documents", json!({"text": "no content"}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_bulk_create_bounds() {
        let app = router().await;

        let (status, _) = send(&app, post_json("/documents/bulk", json!({"documents": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let too_many: Vec<Value> = (0..101).map(|i| json!({"content": format!("doc {}", i)})).collect();
        let (status, _) =
            send(&app, post_json("/documents/bulk", json!({"documents": too_many}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            post_json(
                "/documents/bulk",
                json!({"documents": [{"content": "one"}, {"content": "two"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success_count"], 2);
        assert_eq!(body["failed_count"], 0);
        assert_eq!(body["documents"][1]["content"], "two");
    }

    #[tokio::test]
    async fn test_search() {
        let app = router().await;
        for content in ["rust async runtime", "vector similarity search", "bread recipes"] {
            send(&app, post_json("/documents", json!({"content": content}))).await;
        }

        let (status, body) = send(
            &app,
            post_json("/documents/search", json!({"query": "vector similarity search", "limit": 50})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "vector similarity search");
        assert_eq!(body["total"], 3);
        assert_eq!(body["results"][0]["document"]["content"], "vector similarity search");
        assert!(body["results"][0]["document"].get("embedding").is_none());
        assert!(body["search_time"].is_number());

        let (status, _) = send(
            &app,
            post_json("/documents/search", json!({"query": "q", "limit": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            post_json("/documents/search", json!({"query": "q", "limit": -3})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let app = router().await;
        let (status, body) = send(&app, request("GET", "/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["store_connected"], true);
        assert_eq!(body["provider_ready"], true);
    }
}
