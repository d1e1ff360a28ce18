//! Catalog merge route

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::pdf::Selection;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/combine-pdfs", post(combine_pdfs))
}

#[derive(Debug, Deserialize)]
pub struct CombineRequest {
    #[serde(rename = "checkboxStates")]
    pub checkbox_states: Option<Value>,
}

/// Merge the selected catalog entries into one downloadable PDF
async fn combine_pdfs(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CombineRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let combiner = state.combiner();

    let selection = Selection::parse(request.checkbox_states.as_ref(), combiner.catalog())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = combiner.combine(&selection).await?;
    tracing::info!(
        "Combined {} of {} selected PDFs into {} pages",
        outcome.included.len(),
        selection.count(),
        outcome.page_count
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, outcome.bytes.len())
        .header(header::CONTENT_DISPOSITION, "attachment; filename=combined.pdf")
        .body(Body::from(outcome.bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}
