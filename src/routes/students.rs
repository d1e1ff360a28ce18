//! Student record API routes

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{required_text, SaveStudentRequest, StudentDetails, StudentRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the student records router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/saveStudentDetails", post(save_student))
        .route("/getStudentDetails", post(get_student))
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub message: String,
    pub status: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupRequest {
    #[serde(rename = "studentName")]
    pub student_name: Option<Value>,
}

#[derive(Serialize)]
pub struct LookupResponse {
    pub student: StudentDetails,
    pub message: String,
}

/// Save a student score record
async fn save_student(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SaveStudentRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>> {
    let Json(request) = payload?;
    let student = request.validate()?;

    StudentRepository::new(state.db()).save(&student).await?;
    tracing::info!("Saved student {} {}", student.first_name, student.last_name);

    Ok(Json(SaveResponse {
        message: student.confirmation(),
        status: "OK",
    }))
}

/// Look a student up by first name, ignoring case
async fn get_student(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LookupRequest>, JsonRejection>,
) -> Result<Json<LookupResponse>> {
    let Json(request) = payload?;
    let name = required_text(request.student_name.as_ref())
        .ok_or_else(|| AppError::BadRequest("Student name is required".to_string()))?;

    let student = StudentRepository::new(state.db())
        .find_by_first_name(name)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(LookupResponse {
        message: format!("{} found", student.first_name),
        student,
    }))
}
