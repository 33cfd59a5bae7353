use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Role;

/// Account row. `password_hash` is a PHC string and never leaves the store
/// and auth layers.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub student_number: String,
    pub class_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attendance {
    pub id: i64,
    pub student_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,
    pub score: f64,
}

/// Fields for a new student; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub student_number: String,
    pub class_name: String,
}

/// Partial student update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub student_number: Option<String>,
    pub class_name: Option<String>,
}

impl StudentChanges {
    pub fn apply(self, student: &mut Student) {
        if let Some(name) = self.name {
            student.name = name;
        }
        if let Some(student_number) = self.student_number {
            student.student_number = student_number;
        }
        if let Some(class_name) = self.class_name {
            student.class_name = class_name;
        }
    }
}

/// Search filters. `name` and `student_number` match as substrings,
/// `class_name` must match exactly.
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    pub name: Option<String>,
    pub student_number: Option<String>,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub student_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone)]
pub struct GradeFields {
    pub student_id: i64,
    pub subject: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "present", alias = "출석")]
    Present,
    #[serde(rename = "late", alias = "지각")]
    Late,
    #[serde(rename = "absent", alias = "결석")]
    Absent,
}

impl AttendanceStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
        }
    }

    pub fn parse(s: &str) -> Option<AttendanceStatus> {
        match s {
            "present" => Some(AttendanceStatus::Present),
            "late" => Some(AttendanceStatus::Late),
            "absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
