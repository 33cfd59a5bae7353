use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::{RequireAuth, RequireTeacherOrAdmin};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    CreateStudentRequest, StudentResponse, StudentSearchParams, UpdateStudentRequest,
};
use crate::server::response::{
    ApiError, MessageResponse, PageParams, StoreOptionExt, StoreResultExt,
};
use crate::server::validation::validate_student_fields;
use crate::types::Student;

const DEFAULT_LIMIT: i64 = 100;

fn to_responses(students: Vec<Student>) -> Vec<StudentResponse> {
    students.into_iter().map(StudentResponse::from).collect()
}

pub async fn list_students(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageParams>,
) -> impl IntoResponse {
    let (skip, limit) = page.resolve(DEFAULT_LIMIT);

    let students = state
        .store
        .list_students(skip, limit)
        .api_err("Failed to list students")?;

    Ok::<_, ApiError>(Json(to_responses(students)))
}

pub async fn search_students(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StudentSearchParams>,
) -> impl IntoResponse {
    let students = state
        .store
        .search_students(&params.into())
        .api_err("Failed to search students")?;

    Ok::<_, ApiError>(Json(to_responses(students)))
}

pub async fn get_student(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let student = state
        .store
        .get_student(id)
        .api_err("Failed to get student")?
        .or_not_found("Student not found")?;

    Ok::<_, ApiError>(Json(StudentResponse::from(student)))
}

pub async fn create_student(
    RequireTeacherOrAdmin(user): RequireTeacherOrAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStudentRequest>,
) -> impl IntoResponse {
    validate_student_fields(
        Some(&req.name),
        Some(&req.student_number),
        Some(&req.class_name),
    )?;

    let student = match state.store.create_student(&req.into()) {
        Ok(student) => student,
        Err(Error::Conflict(_)) => {
            return Err(ApiError::conflict("Student number already exists"));
        }
        Err(e) => {
            tracing::error!("Failed to create student: {e}");
            return Err(ApiError::internal("Failed to create student"));
        }
    };

    tracing::info!(
        student_id = student.id,
        "Student {} created by {}",
        student.student_number,
        user.username
    );

    Ok::<_, ApiError>(Json(StudentResponse::from(student)))
}

pub async fn update_student(
    _auth: RequireTeacherOrAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStudentRequest>,
) -> impl IntoResponse {
    validate_student_fields(
        req.name.as_deref(),
        req.student_number.as_deref(),
        req.class_name.as_deref(),
    )?;

    let student = match state.store.update_student(id, req.into()) {
        Ok(student) => student,
        Err(e @ Error::NotFound(_)) => return Err(ApiError::not_found(e.to_string())),
        Err(Error::Conflict(_)) => {
            return Err(ApiError::conflict("Student number already exists"));
        }
        Err(e) => {
            tracing::error!("Failed to update student: {e}");
            return Err(ApiError::internal("Failed to update student"));
        }
    };

    Ok::<_, ApiError>(Json(StudentResponse::from(student)))
}

pub async fn delete_student(
    RequireTeacherOrAdmin(user): RequireTeacherOrAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_student(id)
        .api_err("Failed to delete student")?;

    if !deleted {
        return Err(ApiError::not_found("Student not found"));
    }

    tracing::info!(student_id = id, "Student deleted by {}", user.username);

    Ok::<_, ApiError>(Json(MessageResponse::new("Student deleted successfully")))
}
