//! Processor invocation handler

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dispatch_common::errors::AppError;
use dispatch_processor::{ProcessFileRequest, ProcessorError};
use serde::Serialize;
use std::time::Instant;
use tracing::error;

use crate::app::AppState;

/// Body of a failed invocation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FatalResponse {
    pub error: String,
    pub processing_time_ms: u64,
}

fn fatal(started: Instant, message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(FatalResponse {
            error: message,
            processing_time_ms: started.elapsed().as_millis() as u64,
        }),
    )
        .into_response()
}

/// Process one chunk of a dispatch file
pub async fn process_file(
    State(state): State<AppState>,
    payload: Result<Json<ProcessFileRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            error!(error = %rejection.body_text(), "Malformed invocation body");
            return fatal(started, rejection.body_text());
        }
    };

    match state.processor.process(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e @ (ProcessorError::UnsupportedAction(_) | ProcessorError::ChunkIndexOutOfRange(_))) => {
            AppError::from(e).into_response()
        }
        Err(e) => {
            error!(error = %e, "Processing failed");
            fatal(started, e.to_string())
        }
    }
}
