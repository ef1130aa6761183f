use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use fulfillment_core::{QueueCounts, SanitizedConfig};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

#[derive(Serialize)]
pub struct QueueStatus {
    #[serde(flatten)]
    pub counts: QueueCounts,
    pub pending: u64,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub queues: BTreeMap<String, QueueStatus>,
}

/// Job counts per queue. A queue whose counts cannot be read is left out.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let mut queues = BTreeMap::new();
    for (queue, counts) in state.queue_counts() {
        match counts {
            Ok(counts) => {
                let pending = counts.pending();
                queues.insert(queue.to_string(), QueueStatus { counts, pending });
            }
            Err(e) => warn!(queue, error = %e, "Failed to read queue counts"),
        }
    }
    Json(StatusResponse { queues })
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
