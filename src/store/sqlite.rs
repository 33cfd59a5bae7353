use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const USER_COLUMNS: &str = "id, username, password_hash, role";
const STUDENT_COLUMNS: &str = "id, name, student_number, class_name";
const ATTENDANCE_COLUMNS: &str = "id, student_id, date, status";
const GRADE_COLUMNS: &str = "id, student_id, subject, score";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database. Nothing is persisted.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

/// Which constraint a failed write tripped, if any.
enum Violation {
    Unique,
    ForeignKey,
}

fn constraint_violation(err: &rusqlite::Error) -> Option<Violation> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            match e.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Some(Violation::Unique)
                }
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Violation::ForeignKey),
                _ => None,
            }
        }
        _ => None,
    }
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: Role::parse(&role).ok_or_else(|| conversion_error(3, format!("invalid role '{role}'")))?,
    })
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        student_number: row.get(2)?,
        class_name: row.get(3)?,
    })
}

fn attendance_from_row(row: &Row<'_>) -> rusqlite::Result<Attendance> {
    let status: String = row.get(3)?;
    Ok(Attendance {
        id: row.get(0)?,
        student_id: row.get(1)?,
        date: row.get(2)?,
        status: AttendanceStatus::parse(&status)
            .ok_or_else(|| conversion_error(3, format!("invalid attendance status '{status}'")))?,
    })
}

fn grade_from_row(row: &Row<'_>) -> rusqlite::Result<Grade> {
    Ok(Grade {
        id: row.get(0)?,
        student_id: row.get(1)?,
        subject: row.get(2)?,
        score: row.get(3)?,
    })
}

fn student_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM students WHERE id = ?1", params![id], |_| Ok(()))
        .optional()
        .map(|found| found.is_some())
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User> {
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)",
            params![username, password_hash, role.as_str()],
        );

        match result {
            Ok(_) => Ok(User {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                role,
            }),
            Err(e) if matches!(constraint_violation(&e), Some(Violation::Unique)) => {
                Err(Error::Conflict("Username already registered".to_string()))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn count_users(&self) -> Result<i64> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(Error::from)
    }

    // Student operations

    fn create_student(&self, student: &NewStudent) -> Result<Student> {
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO students (name, student_number, class_name) VALUES (?1, ?2, ?3)",
            params![student.name, student.student_number, student.class_name],
        );

        match result {
            Ok(_) => Ok(Student {
                id: conn.last_insert_rowid(),
                name: student.name.clone(),
                student_number: student.student_number.clone(),
                class_name: student.class_name.clone(),
            }),
            Err(e) if matches!(constraint_violation(&e), Some(Violation::Unique)) => {
                Err(Error::Conflict("Student number already exists".to_string()))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_student(&self, id: i64) -> Result<Option<Student>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
            params![id],
            student_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_students(&self, skip: i64, limit: i64) -> Result<Vec<Student>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY id LIMIT ?1 OFFSET ?2"
        ))?;

        let rows = stmt.query_map(params![limit, skip], student_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn search_students(&self, filter: &StudentFilter) -> Result<Vec<Student>> {
        // instr() keeps substring matching case-sensitive and free of LIKE wildcards
        let mut clauses = Vec::new();
        let mut values: Vec<&str> = Vec::new();

        if let Some(name) = &filter.name {
            values.push(name.as_str());
            clauses.push(format!("instr(name, ?{}) > 0", values.len()));
        }
        if let Some(number) = &filter.student_number {
            values.push(number.as_str());
            clauses.push(format!("instr(student_number, ?{}) > 0", values.len()));
        }
        if let Some(class_name) = &filter.class_name {
            values.push(class_name.as_str());
            clauses.push(format!("class_name = ?{}", values.len()));
        }

        let mut sql = format!("SELECT {STUDENT_COLUMNS} FROM students");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), student_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_student(&self, id: i64, changes: StudentChanges) -> Result<Student> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut student = tx
            .query_row(
                &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
                params![id],
                student_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound("Student"))?;

        changes.apply(&mut student);

        let result = tx.execute(
            "UPDATE students SET name = ?1, student_number = ?2, class_name = ?3 WHERE id = ?4",
            params![student.name, student.student_number, student.class_name, id],
        );

        match result {
            Ok(_) => {}
            Err(e) if matches!(constraint_violation(&e), Some(Violation::Unique)) => {
                return Err(Error::Conflict("Student number already exists".to_string()));
            }
            Err(e) => return Err(Error::from(e)),
        }

        tx.commit()?;
        Ok(student)
    }

    fn delete_student(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !student_exists(&tx, id)? {
            return Ok(false);
        }

        let attendance = tx.execute("DELETE FROM attendances WHERE student_id = ?1", params![id])?;
        let grades = tx.execute("DELETE FROM grades WHERE student_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM students WHERE id = ?1", params![id])?;

        tx.commit()?;

        tracing::debug!(
            student_id = id,
            attendance,
            grades,
            "Removed student with dependent records"
        );
        Ok(rows > 0)
    }

    // Attendance operations

    fn create_attendance(&self, attendance: &NewAttendance) -> Result<Attendance> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !student_exists(&tx, attendance.student_id)? {
            return Err(Error::NotFound("Student"));
        }

        let result = tx.execute(
            "INSERT INTO attendances (student_id, date, status) VALUES (?1, ?2, ?3)",
            params![attendance.student_id, attendance.date, attendance.status.as_str()],
        );

        match result {
            Ok(_) => {}
            Err(e) => {
                return Err(match constraint_violation(&e) {
                    Some(Violation::Unique) => {
                        Error::Conflict("Attendance already recorded for this date".to_string())
                    }
                    Some(Violation::ForeignKey) => Error::NotFound("Student"),
                    None => Error::from(e),
                });
            }
        }

        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Attendance {
            id,
            student_id: attendance.student_id,
            date: attendance.date,
            status: attendance.status,
        })
    }

    fn list_attendance(&self, skip: i64, limit: i64) -> Result<Vec<Attendance>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances ORDER BY id LIMIT ?1 OFFSET ?2"
        ))?;

        let rows = stmt.query_map(params![limit, skip], attendance_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_student_attendance(&self, student_id: i64) -> Result<Vec<Attendance>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendances WHERE student_id = ?1 ORDER BY date, id"
        ))?;

        let rows = stmt.query_map(params![student_id], attendance_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_attendance(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM attendances WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Grade operations

    fn create_grade(&self, grade: &GradeFields) -> Result<Grade> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !student_exists(&tx, grade.student_id)? {
            return Err(Error::NotFound("Student"));
        }

        tx.execute(
            "INSERT INTO grades (student_id, subject, score) VALUES (?1, ?2, ?3)",
            params![grade.student_id, grade.subject, grade.score],
        )?;

        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Grade {
            id,
            student_id: grade.student_id,
            subject: grade.subject.clone(),
            score: grade.score,
        })
    }

    fn get_grade(&self, id: i64) -> Result<Option<Grade>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {GRADE_COLUMNS} FROM grades WHERE id = ?1"),
            params![id],
            grade_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_grades(&self, skip: i64, limit: i64) -> Result<Vec<Grade>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {GRADE_COLUMNS} FROM grades ORDER BY id LIMIT ?1 OFFSET ?2"
        ))?;

        let rows = stmt.query_map(params![limit, skip], grade_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_student_grades(&self, student_id: i64) -> Result<Vec<Grade>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {GRADE_COLUMNS} FROM grades WHERE student_id = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![student_id], grade_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_grade(&self, id: i64, grade: &GradeFields) -> Result<Grade> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let exists = tx
            .query_row("SELECT 1 FROM grades WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Err(Error::NotFound("Grade"));
        }
        if !student_exists(&tx, grade.student_id)? {
            return Err(Error::NotFound("Student"));
        }

        tx.execute(
            "UPDATE grades SET student_id = ?1, subject = ?2, score = ?3 WHERE id = ?4",
            params![grade.student_id, grade.subject, grade.score, id],
        )?;
        tx.commit()?;

        Ok(Grade {
            id,
            student_id: grade.student_id,
            subject: grade.subject.clone(),
            score: grade.score,
        })
    }

    fn delete_grade(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM grades WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn open_store(temp: &TempDir) -> SqliteStore {
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
    }

    fn new_student(number: &str) -> NewStudent {
        NewStudent {
            name: "Test Student".to_string(),
            student_number: number.to_string(),
            class_name: "1-A".to_string(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn count(store: &SqliteStore, sql: &str, id: i64) -> i64 {
        store
            .conn()
            .query_row(sql, params![id], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"students".to_string()));
        assert!(tables.contains(&"attendances".to_string()));
        assert!(tables.contains(&"grades".to_string()));
    }

    #[test]
    fn test_duplicate_username_conflicts_and_keeps_first() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let first = store.create_user("alice", "hash-1", Role::Teacher).unwrap();
        let second = store.create_user("alice", "hash-2", Role::Admin);
        assert!(matches!(second, Err(Error::Conflict(_))));

        let fetched = store.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(fetched.id, first.id);
        assert_eq!(fetched.password_hash, "hash-1");
        assert_eq!(fetched.role, Role::Teacher);
        assert_eq!(store.count_users().unwrap(), 1);
    }

    #[test]
    fn test_student_number_is_unique() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let first = store.create_student(&new_student("2024001")).unwrap();
        assert_eq!(first.id, 1);

        let result = store.create_student(&new_student("2024001"));
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(store.list_students(0, 100).unwrap().len(), 1);

        // Numbers compare case-sensitively
        store.create_student(&new_student("a100")).unwrap();
        store.create_student(&new_student("A100")).unwrap();
    }

    #[test]
    fn test_update_student_partial_and_conflict() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let a = store.create_student(&new_student("2024001")).unwrap();
        store.create_student(&new_student("2024002")).unwrap();

        let updated = store
            .update_student(
                a.id,
                StudentChanges {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.student_number, "2024001");
        assert_eq!(updated.class_name, "1-A");

        let clash = store.update_student(
            a.id,
            StudentChanges {
                student_number: Some("2024002".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(clash, Err(Error::Conflict(_))));
        assert_eq!(store.get_student(a.id).unwrap().unwrap().student_number, "2024001");

        let missing = store.update_student(999, StudentChanges::default());
        assert!(matches!(missing, Err(Error::NotFound("Student"))));
    }

    #[test]
    fn test_delete_student_cascades_children() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let student = store.create_student(&new_student("2024001")).unwrap();
        let other = store.create_student(&new_student("2024002")).unwrap();

        for day in ["2024-03-01", "2024-03-02", "2024-03-03"] {
            store
                .create_attendance(&NewAttendance {
                    student_id: student.id,
                    date: date(day),
                    status: AttendanceStatus::Present,
                })
                .unwrap();
        }
        for subject in ["Math", "Math", "English"] {
            store
                .create_grade(&GradeFields {
                    student_id: student.id,
                    subject: subject.to_string(),
                    score: 80.0,
                })
                .unwrap();
        }
        store
            .create_grade(&GradeFields {
                student_id: other.id,
                subject: "Math".to_string(),
                score: 70.0,
            })
            .unwrap();

        assert!(store.delete_student(student.id).unwrap());

        assert!(store.get_student(student.id).unwrap().is_none());
        assert_eq!(
            count(&store, "SELECT COUNT(*) FROM attendances WHERE student_id = ?1", student.id),
            0
        );
        assert_eq!(
            count(&store, "SELECT COUNT(*) FROM grades WHERE student_id = ?1", student.id),
            0
        );
        assert_eq!(store.list_student_grades(other.id).unwrap().len(), 1);

        assert!(!store.delete_student(student.id).unwrap());
    }

    #[test]
    fn test_attendance_one_per_day() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let student = store.create_student(&new_student("2024001")).unwrap();

        let mark = NewAttendance {
            student_id: student.id,
            date: date("2024-03-01"),
            status: AttendanceStatus::Present,
        };
        store.create_attendance(&mark).unwrap();

        let again = store.create_attendance(&NewAttendance {
            status: AttendanceStatus::Late,
            ..mark.clone()
        });
        assert!(matches!(again, Err(Error::Conflict(_))));

        let rows = store.list_student_attendance(student.id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Present);
        assert_eq!(rows[0].date, date("2024-03-01"));
    }

    #[test]
    fn test_attendance_requires_student() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let result = store.create_attendance(&NewAttendance {
            student_id: 42,
            date: date("2024-03-01"),
            status: AttendanceStatus::Absent,
        });
        assert!(matches!(result, Err(Error::NotFound("Student"))));
        assert!(store.list_student_attendance(42).unwrap().is_empty());
    }

    #[test]
    fn test_grade_update_replaces_fields() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let student = store.create_student(&new_student("2024001")).unwrap();

        let grade = store
            .create_grade(&GradeFields {
                student_id: student.id,
                subject: "Math".to_string(),
                score: 95.0,
            })
            .unwrap();

        let updated = store
            .update_grade(
                grade.id,
                &GradeFields {
                    student_id: student.id,
                    subject: "Science".to_string(),
                    score: 100.0,
                },
            )
            .unwrap();
        assert_eq!(updated.subject, "Science");
        assert_eq!(store.get_grade(grade.id).unwrap().unwrap().score, 100.0);

        let bad_student = store.update_grade(
            grade.id,
            &GradeFields {
                student_id: 999,
                subject: "Math".to_string(),
                score: 1.0,
            },
        );
        assert!(matches!(bad_student, Err(Error::NotFound("Student"))));

        let missing = store.update_grade(
            999,
            &GradeFields {
                student_id: student.id,
                subject: "Math".to_string(),
                score: 1.0,
            },
        );
        assert!(matches!(missing, Err(Error::NotFound("Grade"))));

        let both_missing = store.update_grade(
            999,
            &GradeFields {
                student_id: 999,
                subject: "Math".to_string(),
                score: 1.0,
            },
        );
        assert!(matches!(both_missing, Err(Error::NotFound("Grade"))));
    }

    #[test]
    fn test_search_students_filters() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        for (name, number, class_name) in [
            ("Kim Minji", "2024001", "1-A"),
            ("Kim Jisoo", "2024002", "1-B"),
            ("Lee Hana", "2023001", "1-A"),
        ] {
            store
                .create_student(&NewStudent {
                    name: name.to_string(),
                    student_number: number.to_string(),
                    class_name: class_name.to_string(),
                })
                .unwrap();
        }

        let all = store.search_students(&StudentFilter::default()).unwrap();
        assert_eq!(all.len(), 3);

        let kims = store
            .search_students(&StudentFilter {
                name: Some("Kim".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(kims.len(), 2);

        let kims_in_a = store
            .search_students(&StudentFilter {
                name: Some("Kim".to_string()),
                class_name: Some("1-A".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(kims_in_a.len(), 1);
        assert_eq!(kims_in_a[0].student_number, "2024001");

        let by_number = store
            .search_students(&StudentFilter {
                student_number: Some("2023".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_number.len(), 1);
        assert_eq!(by_number[0].name, "Lee Hana");

        // class_name is an exact match, not a substring
        let partial_class = store
            .search_students(&StudentFilter {
                class_name: Some("1-".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(partial_class.is_empty());

        let wildcard = store
            .search_students(&StudentFilter {
                name: Some("%".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(wildcard.is_empty());
    }

    #[test]
    fn test_list_pagination() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        for n in 0..5 {
            store.create_student(&new_student(&format!("2024{n:03}"))).unwrap();
        }

        let page = store.list_students(1, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, 2);
        assert_eq!(page[1].id, 3);
    }
}
