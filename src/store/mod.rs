mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Uniqueness rules (username, student number, one attendance mark per
/// student per day) are enforced by the database and reported as
/// [`Error::Conflict`](crate::error::Error::Conflict). Missing parents and
/// missing rows on update are reported as
/// [`Error::NotFound`](crate::error::Error::NotFound), naming the entity.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn count_users(&self) -> Result<i64>;

    // Student operations
    fn create_student(&self, student: &NewStudent) -> Result<Student>;
    fn get_student(&self, id: i64) -> Result<Option<Student>>;
    fn list_students(&self, skip: i64, limit: i64) -> Result<Vec<Student>>;
    fn search_students(&self, filter: &StudentFilter) -> Result<Vec<Student>>;
    fn update_student(&self, id: i64, changes: StudentChanges) -> Result<Student>;
    /// Removes the student with its attendance and grade rows in one transaction.
    fn delete_student(&self, id: i64) -> Result<bool>;

    // Attendance operations
    fn create_attendance(&self, attendance: &NewAttendance) -> Result<Attendance>;
    fn list_attendance(&self, skip: i64, limit: i64) -> Result<Vec<Attendance>>;
    fn list_student_attendance(&self, student_id: i64) -> Result<Vec<Attendance>>;
    fn delete_attendance(&self, id: i64) -> Result<bool>;

    // Grade operations
    fn create_grade(&self, grade: &GradeFields) -> Result<Grade>;
    fn get_grade(&self, id: i64) -> Result<Option<Grade>>;
    fn list_grades(&self, skip: i64, limit: i64) -> Result<Vec<Grade>>;
    fn list_student_grades(&self, student_id: i64) -> Result<Vec<Grade>>;
    fn update_grade(&self, id: i64, grade: &GradeFields) -> Result<Grade>;
    fn delete_grade(&self, id: i64) -> Result<bool>;
}
