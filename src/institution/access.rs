//! Tenant access checks.
//!
//! * owner: the institution's owner user.
//! * staff: `is_staff` users, admitted everywhere.
//! * member: owner, staff, or a user whose profile belongs to the institution.

use diesel::prelude::*;

use super::types::Institution;
use crate::core::shared::error::ApiError;
use crate::core::shared::schema::{institutions, profiles};
use crate::security::auth::AuthenticatedUser;

pub fn load_institution(conn: &mut PgConnection, id: i32) -> Result<Institution, ApiError> {
    institutions::table
        .find(id)
        .select(Institution::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Institution not found.".into()))
}

pub fn is_owner(user: &AuthenticatedUser, institution: &Institution) -> bool {
    user.is_staff || institution.owner_id == user.user_id
}

pub fn is_member(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    institution: &Institution,
) -> Result<bool, ApiError> {
    if is_owner(user, institution) {
        return Ok(true);
    }
    let count: i64 = profiles::table
        .filter(profiles::user_id.eq(user.user_id))
        .filter(profiles::institution_id.eq(institution.id))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Loads the institution and requires the caller to own it (or be staff).
pub fn require_owner(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    institution_id: i32,
) -> Result<Institution, ApiError> {
    let institution = load_institution(conn, institution_id)?;
    if !is_owner(user, &institution) {
        return Err(ApiError::access_denied());
    }
    Ok(institution)
}

/// Loads the institution and requires the caller to belong to it.
pub fn require_member(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    institution_id: i32,
) -> Result<Institution, ApiError> {
    let institution = load_institution(conn, institution_id)?;
    if !is_member(conn, user, &institution)? {
        return Err(ApiError::access_denied());
    }
    Ok(institution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn institution(owner_id: i32) -> Institution {
        let now = Utc::now();
        Institution {
            id: 1,
            owner_id,
            institution_email: None,
            institution_name: "Acme Telecom".into(),
            first_phone_number: None,
            second_phone_number: None,
            institution_logo: None,
            theme_color: None,
            setup: false,
            location: None,
            latitude: None,
            longitude: None,
            approval_status: "approved".into(),
            approval_date: None,
            approved_by: None,
            rejection_reason: None,
            description: None,
            created_at: now,
            updated_at: now,
            created_by: Some(owner_id),
        }
    }

    fn user(user_id: i32, is_staff: bool) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id,
            email: format!("user{}@example.com", user_id),
            is_staff,
        }
    }

    #[test]
    fn test_is_owner() {
        let inst = institution(7);
        assert!(is_owner(&user(7, false), &inst));
        assert!(is_owner(&user(99, true), &inst));
        assert!(!is_owner(&user(8, false), &inst));
    }
}
