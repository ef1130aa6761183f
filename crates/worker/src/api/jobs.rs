//! Job ingress: lets the storefront enqueue work over HTTP.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use fulfillment_core::{
    enqueue, EmailConfirmationMessage, OrderConfirmationMessage, OrderMessage, SendOptions,
    CONFIRMATION_EMAILS_QUEUE, ORDERS_QUEUE, ORDER_CONFIRMATIONS_QUEUE,
};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub data: Value,
    #[serde(default)]
    pub options: Option<SendOptions>,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn check<T: DeserializeOwned>(data: &Value) -> Result<(), String> {
    T::deserialize(data).map(|_| ()).map_err(|e| e.to_string())
}

/// Reject payloads the queue's consumer could never decode.
fn validate(queue: &str, data: &Value) -> Result<(), ApiError> {
    let checked = match queue {
        ORDERS_QUEUE => check::<OrderMessage>(data),
        CONFIRMATION_EMAILS_QUEUE => check::<EmailConfirmationMessage>(data),
        ORDER_CONFIRMATIONS_QUEUE => check::<OrderConfirmationMessage>(data),
        _ => return Err(error(StatusCode::NOT_FOUND, format!("Unknown queue: {}", queue))),
    };
    checked.map_err(|reason| {
        error(
            StatusCode::BAD_REQUEST,
            format!("Invalid payload for {}: {}", queue, reason),
        )
    })
}

/// POST /api/v1/queues/{queue}/jobs
///
/// Enqueue one job on a consumed queue.
pub async fn enqueue_job(
    State(state): State<Arc<AppState>>,
    Path(queue): Path<String>,
    Json(body): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), ApiError> {
    validate(&queue, &body.data)?;

    let options = body.options.unwrap_or_default();
    match enqueue(state.jobs(), &queue, &body.data, &options) {
        Ok(id) => {
            info!(queue = %queue, job_id = %id, "Job enqueued");
            Ok((StatusCode::CREATED, Json(EnqueueResponse { id })))
        }
        Err(e) => {
            warn!(queue = %queue, error = %e, "Failed to enqueue job");
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
