mod attendance;
mod auth;
mod grades;
mod students;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::server::AppState;

/// Routes under `/api`. Collection endpoints answer with and without a
/// trailing slash.
pub fn api_router() -> Router<Arc<AppState>> {
    let student_collection = get(students::list_students).post(students::create_student);
    let attendance_collection = get(attendance::list_attendance).post(attendance::create_attendance);
    let grade_collection = get(grades::list_grades).post(grades::create_grade);

    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        // Students
        .route("/api/students", student_collection.clone())
        .route("/api/students/", student_collection)
        .route("/api/students/search", get(students::search_students))
        .route(
            "/api/students/{id}",
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        // Attendance
        .route("/api/attendance", attendance_collection.clone())
        .route("/api/attendance/", attendance_collection)
        .route(
            "/api/attendance/student/{student_id}",
            get(attendance::list_student_attendance),
        )
        .route("/api/attendance/{id}", delete(attendance::delete_attendance))
        // Grades
        .route("/api/grades", grade_collection.clone())
        .route("/api/grades/", grade_collection)
        .route(
            "/api/grades/student/{student_id}",
            get(grades::list_student_grades),
        )
        .route(
            "/api/grades/{id}",
            put(grades::update_grade).delete(grades::delete_grade),
        )
}
