use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::{RequireAuth, RequireTeacherOrAdmin};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{GradeRequest, GradeResponse};
use crate::server::response::{ApiError, MessageResponse, PageParams, StoreResultExt};
use crate::server::validation::validate_subject;
use crate::types::Grade;

const DEFAULT_LIMIT: i64 = 100;

fn to_responses(grades: Vec<Grade>) -> Vec<GradeResponse> {
    grades.into_iter().map(GradeResponse::from).collect()
}

pub async fn list_grades(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageParams>,
) -> impl IntoResponse {
    let (skip, limit) = page.resolve(DEFAULT_LIMIT);

    let grades = state
        .store
        .list_grades(skip, limit)
        .api_err("Failed to list grades")?;

    Ok::<_, ApiError>(Json(to_responses(grades)))
}

pub async fn list_student_grades(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<i64>,
) -> impl IntoResponse {
    let grades = state
        .store
        .list_student_grades(student_id)
        .api_err("Failed to list grades")?;

    Ok::<_, ApiError>(Json(to_responses(grades)))
}

pub async fn create_grade(
    RequireTeacherOrAdmin(user): RequireTeacherOrAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<GradeRequest>,
) -> impl IntoResponse {
    validate_subject(&req.subject)?;

    let grade = match state.store.create_grade(&req.into()) {
        Ok(grade) => grade,
        Err(e @ Error::NotFound(_)) => return Err(ApiError::not_found(e.to_string())),
        Err(e) => {
            tracing::error!("Failed to create grade: {e}");
            return Err(ApiError::internal("Failed to create grade"));
        }
    };

    tracing::info!(
        student_id = grade.student_id,
        "Grade for {} recorded by {}",
        grade.subject,
        user.username
    );

    Ok::<_, ApiError>(Json(GradeResponse::from(grade)))
}

pub async fn update_grade(
    _auth: RequireTeacherOrAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<GradeRequest>,
) -> impl IntoResponse {
    validate_subject(&req.subject)?;

    let grade = match state.store.update_grade(id, &req.into()) {
        Ok(grade) => grade,
        Err(e @ Error::NotFound(_)) => return Err(ApiError::not_found(e.to_string())),
        Err(e) => {
            tracing::error!("Failed to update grade: {e}");
            return Err(ApiError::internal("Failed to update grade"));
        }
    };

    Ok::<_, ApiError>(Json(GradeResponse::from(grade)))
}

pub async fn delete_grade(
    _auth: RequireTeacherOrAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_grade(id)
        .api_err("Failed to delete grade")?;

    if !deleted {
        return Err(ApiError::not_found("Grade not found"));
    }

    Ok::<_, ApiError>(Json(MessageResponse::new("Grade deleted successfully")))
}
