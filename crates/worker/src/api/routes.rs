use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, jobs, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        .route("/queues/{queue}/jobs", post(jobs::enqueue_job));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use fulfillment_core::testing::fixtures;
    use fulfillment_core::{
        enqueue, Config, JobQueue, OrderMessage, SendOptions, SqliteJobQueue, ORDERS_QUEUE,
        ORDER_CONFIRMATIONS_QUEUE,
    };

    use crate::state::QUEUES;

    fn test_state() -> (Arc<AppState>, Arc<SqliteJobQueue>) {
        let jobs = Arc::new(SqliteJobQueue::in_memory().unwrap());
        for queue in QUEUES {
            jobs.create_queue(queue).unwrap();
        }
        let mut config = Config::default();
        config.storage.secret_access_key = "very-secret".to_string();
        config.email.api_key = "re_secret".to_string();
        let state = Arc::new(AppState::new(config, jobs.clone() as Arc<dyn JobQueue>));
        (state, jobs)
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = test_state();
        let (status, body) = get(create_router(state), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_config_is_sanitized() {
        let (state, _) = test_state();
        let (status, body) = get(create_router(state), "/api/v1/config").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("very-secret"));
        assert!(!body.contains("re_secret"));

        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["storage"]["bucket_name"], "comics");
        assert_eq!(json["email"]["api_key_configured"], true);
    }

    #[tokio::test]
    async fn test_status_reports_queue_counts() {
        let (state, jobs) = test_state();
        let payload = serde_json::json!({ "orderId": "ord_1" });
        enqueue(jobs.as_ref(), ORDERS_QUEUE, &payload, &SendOptions::default()).unwrap();
        enqueue(jobs.as_ref(), ORDERS_QUEUE, &payload, &SendOptions::default()).unwrap();
        let job = jobs.fetch(ORDERS_QUEUE).unwrap().unwrap();
        jobs.complete(&job.id).unwrap();

        let (status, body) = get(create_router(state), "/api/v1/status").await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_str(&body).unwrap();
        let orders = &json["queues"]["orders"];
        assert_eq!(orders["created"], 1);
        assert_eq!(orders["completed"], 1);
        assert_eq!(orders["pending"], 1);
        assert_eq!(json["queues"]["confirmation_emails"]["pending"], 0);
        assert_eq!(json["queues"]["confirmations"]["failed"], 0);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (state, _) = test_state();
        let router = create_router(state);
        get(router.clone(), "/api/v1/health").await;

        let (status, body) = get(router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("fulfillment_http_requests_total"));
        assert!(body.contains("fulfillment_queue_jobs"));
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_enqueue_order() {
        let (state, jobs) = test_state();
        let order = fixtures::order("ord_1", &["comic-a", "comic-b"]);
        let body = serde_json::json!({
            "data": order,
            "options": { "retry_limit": 5, "retry_delay_secs": 30 }
        });

        let (status, json) =
            post_json(create_router(state), "/api/v1/queues/orders/jobs", body).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = json["id"].as_str().unwrap().to_string();

        assert_eq!(jobs.counts(ORDERS_QUEUE).unwrap().created, 1);
        let job = jobs.fetch(ORDERS_QUEUE).unwrap().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.options.retry_limit, 5);
        assert_eq!(job.options.retry_delay_secs, 30);
        let stored: OrderMessage = serde_json::from_str(&job.data).unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn test_enqueue_confirmation_uses_default_options() {
        let (state, jobs) = test_state();
        let body = serde_json::json!({ "data": fixtures::order_confirmation("ord_2") });

        let (status, _) =
            post_json(create_router(state), "/api/v1/queues/confirmations/jobs", body).await;
        assert_eq!(status, StatusCode::CREATED);

        let job = jobs.fetch(ORDER_CONFIRMATIONS_QUEUE).unwrap().unwrap();
        assert_eq!(job.options, SendOptions::default());
    }

    #[tokio::test]
    async fn test_enqueue_unknown_queue_is_not_found() {
        let (state, _) = test_state();
        let body = serde_json::json!({ "data": fixtures::order("ord_1", &["comic-a"]) });

        let (status, json) =
            post_json(create_router(state), "/api/v1/queues/refunds/jobs", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("refunds"));
    }

    #[tokio::test]
    async fn test_enqueue_rejects_malformed_payload() {
        let (state, jobs) = test_state();
        let body = serde_json::json!({ "data": { "orderId": "ord_1" } });

        let (status, json) =
            post_json(create_router(state), "/api/v1/queues/orders/jobs", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("orders"));
        assert_eq!(jobs.counts(ORDERS_QUEUE).unwrap().created, 0);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (state, _) = test_state();
        let (status, _) = get(create_router(state), "/api/v1/orders").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
