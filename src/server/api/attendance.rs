use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::{RequireAuth, RequireTeacherOrAdmin};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{AttendanceResponse, CreateAttendanceRequest};
use crate::server::response::{ApiError, MessageResponse, PageParams, StoreResultExt};
use crate::types::Attendance;

const DEFAULT_LIMIT: i64 = 10_000;

fn to_responses(records: Vec<Attendance>) -> Vec<AttendanceResponse> {
    records.into_iter().map(AttendanceResponse::from).collect()
}

pub async fn list_attendance(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageParams>,
) -> impl IntoResponse {
    let (skip, limit) = page.resolve(DEFAULT_LIMIT);

    let records = state
        .store
        .list_attendance(skip, limit)
        .api_err("Failed to list attendance")?;

    Ok::<_, ApiError>(Json(to_responses(records)))
}

pub async fn list_student_attendance(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<i64>,
) -> impl IntoResponse {
    let records = state
        .store
        .list_student_attendance(student_id)
        .api_err("Failed to list attendance")?;

    Ok::<_, ApiError>(Json(to_responses(records)))
}

pub async fn create_attendance(
    RequireTeacherOrAdmin(user): RequireTeacherOrAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAttendanceRequest>,
) -> impl IntoResponse {
    let record = match state.store.create_attendance(&req.into()) {
        Ok(record) => record,
        Err(e @ Error::NotFound(_)) => return Err(ApiError::not_found(e.to_string())),
        Err(Error::Conflict(message)) => return Err(ApiError::conflict(message)),
        Err(e) => {
            tracing::error!("Failed to record attendance: {e}");
            return Err(ApiError::internal("Failed to record attendance"));
        }
    };

    tracing::info!(
        student_id = record.student_id,
        "Attendance {} on {} recorded by {}",
        record.status,
        record.date,
        user.username
    );

    Ok::<_, ApiError>(Json(AttendanceResponse::from(record)))
}

pub async fn delete_attendance(
    _auth: RequireTeacherOrAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_attendance(id)
        .api_err("Failed to delete attendance")?;

    if !deleted {
        return Err(ApiError::not_found("Attendance not found"));
    }

    Ok::<_, ApiError>(Json(MessageResponse::new("Attendance deleted successfully")))
}
