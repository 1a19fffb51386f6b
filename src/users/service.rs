use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};

use super::types::{NewUser, Profile, User};
use crate::core::config::BootstrapAdmin;
use crate::core::shared::error::{ApiError, FieldErrors};
use crate::core::shared::schema::{profiles, users};
use crate::security::password::{hash_password, password_issues, verify_password};
use crate::security::validation::is_valid_email;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_registration(email: &str, fullname: &str, password: Option<&str>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if email.trim().is_empty() {
        errors.add("email", "Email is required.");
    } else if !is_valid_email(email.trim()) {
        errors.add("email", "Enter a valid email address.");
    }
    if fullname.trim().is_empty() {
        errors.add("fullname", "Full name is required.");
    }
    if let Some(password) = password {
        for issue in password_issues(password) {
            errors.add("password", issue);
        }
    }
    errors
}

pub fn find_user_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<User>, ApiError> {
    users::table
        .filter(users::email.eq(normalize_email(email)))
        .select(User::as_select())
        .first(conn)
        .optional()
        .map_err(ApiError::from)
}

pub fn get_user(conn: &mut PgConnection, id: i32) -> Result<User, ApiError> {
    users::table
        .find(id)
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found.".into()))
}

pub fn profile_for_user(conn: &mut PgConnection, user_id: i32) -> Result<Option<Profile>, ApiError> {
    profiles::table
        .filter(profiles::user_id.eq(user_id))
        .select(Profile::as_select())
        .first(conn)
        .optional()
        .map_err(ApiError::from)
}

/// Validates and inserts a user. The password is hashed before storage.
pub fn create_user(
    conn: &mut PgConnection,
    email: &str,
    fullname: &str,
    password: &str,
    is_staff: bool,
) -> Result<User, ApiError> {
    validate_registration(email, fullname, Some(password)).into_result()?;

    if find_user_by_email(conn, email)?.is_some() {
        return Err(ApiError::field(
            "email",
            "A user with this email already exists.",
        ));
    }

    let password_hash =
        hash_password(password).map_err(|e| ApiError::Internal(e.to_string()))?;
    let now = Utc::now();
    let user = diesel::insert_into(users::table)
        .values(&NewUser {
            email: normalize_email(email),
            fullname: fullname.trim().to_string(),
            password_hash,
            is_active: true,
            is_staff,
            created_at: now,
            updated_at: now,
        })
        .returning(User::as_returning())
        .get_result(conn)?;

    info!("Created user {} ({})", user.id, user.email);
    Ok(user)
}

pub fn authenticate(conn: &mut PgConnection, email: &str, password: &str) -> Result<User, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password.".into());

    let user = find_user_by_email(conn, email)?.ok_or_else(invalid)?;
    let matches = verify_password(password, &user.password_hash).map_err(|e| {
        warn!("Stored password hash for user {} is unreadable: {}", user.id, e);
        invalid()
    })?;

    if !matches || !user.is_active {
        return Err(invalid());
    }
    Ok(user)
}

pub fn ensure_bootstrap_admin(
    conn: &mut PgConnection,
    admin: &BootstrapAdmin,
) -> Result<(), ApiError> {
    if find_user_by_email(conn, &admin.email)?.is_some() {
        return Ok(());
    }
    let user = create_user(conn, &admin.email, "Administrator", &admin.password, true)?;
    info!("Bootstrapped staff user {}", user.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_registration() {
        assert!(validate_registration("a@example.com", "Ama Mensah", Some("Secret123")).is_empty());

        let errors = validate_registration("nope", " ", Some("short"));
        assert!(errors.get("email").is_some());
        assert!(errors.get("fullname").is_some());
        assert!(errors.get("password").is_some());

        // Password is optional for institution-created profiles.
        assert!(validate_registration("a@example.com", "Ama", None).is_empty());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Agent@Example.COM "), "agent@example.com");
    }
}
