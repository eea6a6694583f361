//! HTTP router for the rollcall server

use axum::Router;
use rollcall_roster::RosterState;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
pub fn create_router(state: Arc<RosterState>, enable_cors: bool) -> Router {
    let router = rollcall_roster::router(state).layer(TraceLayer::new_for_http());

    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use rollcall_roster::{DateZone, RosterStore};
    use tower::ServiceExt;

    fn test_state() -> Arc<RosterState> {
        let store = RosterStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        Arc::new(RosterState::new(store, DateZone::Utc))
    }

    fn health_request(method: Method) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_cors_disabled_by_default() {
        let app = create_router(test_state(), false);
        let response = app.oneshot(health_request(Method::GET)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_cors_enabled() {
        let app = create_router(test_state(), true);
        let response = app.oneshot(health_request(Method::GET)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_cors_preflight_answered_by_layer() {
        let app = create_router(test_state(), true);
        let response = app.oneshot(health_request(Method::OPTIONS)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let app = create_router(test_state(), false);
        let request = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }
}
