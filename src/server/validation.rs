use crate::server::response::ApiError;

const MAX_USERNAME_LEN: usize = 50;
const MAX_STUDENT_NAME_LEN: usize = 100;
const MAX_STUDENT_NUMBER_LEN: usize = 20;
const MAX_CLASS_NAME_LEN: usize = 50;
const MAX_SUBJECT_LEN: usize = 50;

fn validate_max_len(value: &str, field: &str, max_len: usize) -> Result<(), String> {
    if value.chars().count() > max_len {
        return Err(format!("{field} cannot exceed {max_len} characters"));
    }
    Ok(())
}

fn validate_username_rules(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if username.contains(char::is_whitespace) {
        return Err("Username cannot contain whitespace".to_string());
    }
    validate_max_len(username, "Username", MAX_USERNAME_LEN)
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    validate_username_rules(username).map_err(ApiError::validation)
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::validation("Password cannot be empty"));
    }
    Ok(())
}

/// Checks whichever student fields are present.
pub fn validate_student_fields(
    name: Option<&str>,
    student_number: Option<&str>,
    class_name: Option<&str>,
) -> Result<(), ApiError> {
    let checks = [
        (name, "Name", MAX_STUDENT_NAME_LEN),
        (student_number, "Student number", MAX_STUDENT_NUMBER_LEN),
        (class_name, "Class name", MAX_CLASS_NAME_LEN),
    ];

    for (value, field, max_len) in checks {
        if let Some(value) = value {
            validate_max_len(value, field, max_len).map_err(ApiError::validation)?;
        }
    }
    Ok(())
}

pub fn validate_subject(subject: &str) -> Result<(), ApiError> {
    validate_max_len(subject, "Subject", MAX_SUBJECT_LEN).map_err(ApiError::validation)
}
