use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{
    Attendance, AttendanceStatus, Grade, GradeFields, NewAttendance, NewStudent, Role, Student,
    StudentChanges, StudentFilter, User,
};

// Auth

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

/// Login credentials, sent form-encoded.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    #[must_use]
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

// Students

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub name: String,
    pub student_number: String,
    pub class_name: String,
}

impl From<CreateStudentRequest> for NewStudent {
    fn from(req: CreateStudentRequest) -> Self {
        Self {
            name: req.name,
            student_number: req.student_number,
            class_name: req.class_name,
        }
    }
}

/// Partial update: omitted fields stay as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateStudentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub student_number: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
}

impl From<UpdateStudentRequest> for StudentChanges {
    fn from(req: UpdateStudentRequest) -> Self {
        Self {
            name: req.name,
            student_number: req.student_number,
            class_name: req.class_name,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentSearchParams {
    pub name: Option<String>,
    pub student_number: Option<String>,
    pub class_name: Option<String>,
}

impl From<StudentSearchParams> for StudentFilter {
    fn from(params: StudentSearchParams) -> Self {
        Self {
            name: params.name,
            student_number: params.student_number,
            class_name: params.class_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StudentResponse {
    pub id: i64,
    pub name: String,
    pub student_number: String,
    pub class_name: String,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            student_number: student.student_number,
            class_name: student.class_name,
        }
    }
}

// Attendance

#[derive(Debug, Deserialize)]
pub struct CreateAttendanceRequest {
    pub student_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

impl From<CreateAttendanceRequest> for NewAttendance {
    fn from(req: CreateAttendanceRequest) -> Self {
        Self {
            student_id: req.student_id,
            date: req.date,
            status: req.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub id: i64,
    pub student_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

impl From<Attendance> for AttendanceResponse {
    fn from(attendance: Attendance) -> Self {
        Self {
            id: attendance.id,
            student_id: attendance.student_id,
            date: attendance.date,
            status: attendance.status,
        }
    }
}

// Grades

/// Used for both create and full-replace update.
#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub student_id: i64,
    pub subject: String,
    pub score: f64,
}

impl From<GradeRequest> for GradeFields {
    fn from(req: GradeRequest) -> Self {
        Self {
            student_id: req.student_id,
            subject: req.subject,
            score: req.score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GradeResponse {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,
    pub score: f64,
}

impl From<Grade> for GradeResponse {
    fn from(grade: Grade) -> Self {
        Self {
            id: grade.id,
            student_id: grade.student_id,
            subject: grade.subject,
            score: grade.score,
        }
    }
}
