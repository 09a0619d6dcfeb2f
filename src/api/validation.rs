//! Input validation for API requests.
//!
//! Every endpoint deserializes into an explicit request struct and runs its
//! fields through these validators before touching storage. For collecting
//! multiple validation errors and returning them as an ApiError, use the
//! `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::RecurrenceType;

lazy_static! {
    /// Regex for validating usernames (alphanumeric plus . _ -, 3-80 chars)
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]{2,79}$").unwrap();

    /// Regex for a plausible email address
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

/// Validate a username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username must be 3-80 characters: letters, digits, dots, dashes or underscores"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 120 {
        return Err("Email is too long (max 120 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters".to_string());
    }

    Ok(())
}

/// Validate a task title
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.is_empty() {
        return Err("Title is required".to_string());
    }

    if title.len() > 200 {
        return Err("Title is too long (max 200 characters)".to_string());
    }

    Ok(())
}

/// Validate a task description
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.len() > 2000 {
        return Err("Description is too long (max 2000 characters)".to_string());
    }

    Ok(())
}

/// Validate a task priority (1-5, 5 being highest)
pub fn validate_priority(priority: i64) -> Result<(), String> {
    if !(1..=5).contains(&priority) {
        return Err("Priority must be between 1 and 5".to_string());
    }

    Ok(())
}

/// Validate a recurrence type string
pub fn validate_recurrence_type(recurrence_type: &str) -> Result<(), String> {
    if RecurrenceType::parse(recurrence_type).is_none() {
        return Err("Recurrence type must be 'daily' or 'weekly'".to_string());
    }

    Ok(())
}

/// Validate a comma-separated weekday list (0-6, Monday = 0)
pub fn validate_recurrence_days(days: &str) -> Result<(), String> {
    if days.trim().is_empty() {
        return Err("Recurrence days are required for weekly tasks".to_string());
    }

    for token in days.split(',') {
        let token = token.trim();
        match token.parse::<u32>() {
            Ok(day) if day <= 6 => {}
            Ok(_) => {
                return Err(format!(
                    "Recurrence day `{token}` is out of range (0-6, Monday is 0)"
                ))
            }
            Err(_) => return Err(format!("Recurrence day `{token}` is not a number")),
        }
    }

    Ok(())
}

/// Validate a UUID-format identifier
pub fn validate_uuid(id: &str, field: &str) -> Result<(), String> {
    if uuid::Uuid::parse_str(id).is_err() {
        return Err(format!("{field} must be a valid UUID"));
    }

    Ok(())
}
