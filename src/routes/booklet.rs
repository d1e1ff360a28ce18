//! Photo booklet route

use std::convert::Infallible;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Size of each body chunk when streaming a booklet
const STREAM_CHUNK: usize = 64 * 1024;

pub fn router() -> Router<AppState> {
    Router::new().route("/generatePDF", post(generate_pdf))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub destinations: Option<Value>,
}

/// Build a booklet and stream it back as `application/pdf`
async fn generate_pdf(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let destinations = match request.destinations {
        Some(Value::Array(items)) => items,
        _ => return Err(AppError::BadRequest("Invalid destinations data".to_string())),
    };
    let requested = destinations.len();

    let outcome = state.booklet().generate(destinations).await?;
    tracing::info!(
        "Generated booklet: {} pages for {} destinations, {} skipped",
        outcome.page_count,
        requested,
        outcome.skipped.len()
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(chunked_body(Bytes::from(outcome.bytes)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn chunked_body(bytes: Bytes) -> Body {
    let len = bytes.len();
    let chunks = (0..len)
        .step_by(STREAM_CHUNK)
        .map(move |start| Ok::<_, Infallible>(bytes.slice(start..(start + STREAM_CHUNK).min(len))));
    Body::from_stream(futures::stream::iter(chunks))
}
