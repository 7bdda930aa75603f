use axum::{routing::get, Router};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::{app_state::AppState, routes};

pub fn create(app_state: AppState) -> Router<()> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", routes::graphql::router())
        .merge(routes::organizations::router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        app_state::RecordStores,
        auth::{test_support, TokenVerifier},
        domain::search::{
            index::MemorySearchIndex, EntityType, IndexerConfig, RecordingJobQueue, SearchConfig,
        },
        repositories::InMemoryRecords,
    };

    fn app(queue: Arc<RecordingJobQueue>) -> Router {
        create(AppState::new(
            RecordStores::memory(InMemoryRecords::new()),
            Arc::new(MemorySearchIndex::new()),
            queue,
            TokenVerifier::new(&test_support::settings(), false),
            SearchConfig::default(),
            IndexerConfig::default(),
        ))
    }

    fn authorized(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                "authorization",
                format!("Bearer {}", test_support::valid_token()),
            );
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let response = app(Arc::new(RecordingJobQueue::new()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mutations_require_a_token() {
        let request = Request::builder()
            .method("POST")
            .uri("/organizations")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "names": ["Pace Gallery"] }).to_string()))
            .unwrap();

        let response = app(Arc::new(RecordingJobQueue::new()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_organization_schedules_a_reindex() {
        let queue = Arc::new(RecordingJobQueue::new());
        let response = app(queue.clone())
            .oneshot(authorized(
                "POST",
                "/organizations",
                Some(json!({ "website": " pacegallery.com ", "names": ["Pace Gallery"] })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["website"], "pacegallery.com");

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].entity_type, EntityType::Organization);
        assert_eq!(Some(jobs[0].entity_id), body["id"].as_i64());
    }

    #[tokio::test]
    async fn invalid_location_is_a_bad_request() {
        let queue = Arc::new(RecordingJobQueue::new());
        let app = app(queue.clone());
        let created = app
            .clone()
            .oneshot(authorized(
                "POST",
                "/organizations",
                Some(json!({ "names": ["Pace Gallery"] })),
            ))
            .await
            .unwrap();
        let id = json_body(created).await["id"].as_i64().unwrap();

        let response = app
            .oneshot(authorized(
                "POST",
                &format!("/organizations/{id}/locations"),
                Some(json!({ "city": "New York", "content": "  " })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
        assert_eq!(queue.jobs().len(), 1);
    }

    #[tokio::test]
    async fn organization_without_names_is_a_bad_request() {
        let queue = Arc::new(RecordingJobQueue::new());
        let response = app(queue.clone())
            .oneshot(authorized(
                "POST",
                "/organizations",
                Some(json!({ "names": [] })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "invalid name: an organization needs at least one name"
        );
        assert!(queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_missing_organization_is_not_found() {
        let response = app(Arc::new(RecordingJobQueue::new()))
            .oneshot(authorized("DELETE", "/organizations/999", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_dispatch_is_service_unavailable() {
        let queue = Arc::new(RecordingJobQueue::new());
        queue.fail_with(crate::domain::search::DispatchError::QueueFull);

        let response = app(queue)
            .oneshot(authorized(
                "POST",
                "/organizations",
                Some(json!({ "names": ["Pace Gallery"] })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
