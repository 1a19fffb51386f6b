use std::collections::BTreeMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use log::error;
use serde::Serialize;
use serde_json::json;

/// Per-field validation messages, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Fields(self))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid fields: {0:?}")]
    Fields(FieldErrors),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Fields(errors)
    }

    pub fn access_denied() -> Self {
        Self::Forbidden("Access denied.".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Fields(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Connection(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Fields(errors) => json!(errors),
            Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg) => json!({ "detail": msg }),
            other => {
                error!("Request failed: {}", other);
                json!({ "detail": "Internal server error." })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound("Not found.".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::Validation(unique_violation_message(info.constraint_name()).to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                if info.message().starts_with("update or delete") {
                    Self::Conflict(
                        "This record is still referenced by other records and cannot be removed."
                            .to_string(),
                    )
                } else {
                    Self::Validation("A referenced record does not exist.".to_string())
                }
            }
            other => {
                error!("Database error: {}", other);
                Self::Database(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

fn unique_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint.unwrap_or_default() {
        "users_email_key" => "A user with this email already exists.",
        "institutions_owner_name_key" => "User Already has an Institution with the same name.",
        "user_branches_user_branch_key" => "This user is already assigned to this branch.",
        "client_companies_api_key_key" => "API key collision, please retry.",
        "client_company_products_pair_key" => {
            "This product is already assigned to this client company."
        }
        "contact_products_pair_key" => "This contact is already linked to this product.",
        "agents_profile_institution_key" => "This profile is already an agent of this institution.",
        "call_group_agents_pair_key" => "This agent is already in this call group.",
        "call_group_contacts_pair_key" => "This contact is already in this call group.",
        _ => "A record with these values already exists.",
    }
}

/// JSON body extractor that reports malformed payloads as 400 `{"detail": ...}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::field("name", "Name is required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::access_denied().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Storage("disk full".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_diesel_not_found_maps_to_404() {
        let err: ApiError = DieselError::NotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_field_errors_collect() {
        let mut errors = FieldErrors::new();
        assert!(errors.clone().into_result().is_ok());

        errors.add("name", "Name is required");
        errors.add("name", "Name is too long");
        errors.add("phone_number", "Phone number is required");

        assert_eq!(errors.get("name").map(<[String]>::len), Some(2));
        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value["phone_number"][0], "Phone number is required");
        assert!(matches!(errors.into_result(), Err(ApiError::Fields(_))));
    }

    #[test]
    fn test_unique_messages() {
        assert_eq!(
            unique_violation_message(Some("institutions_owner_name_key")),
            "User Already has an Institution with the same name."
        );
        assert_eq!(
            unique_violation_message(None),
            "A record with these values already exists."
        );
    }

    #[tokio::test]
    async fn test_malformed_path_and_query_are_json() {
        use axum::{body::Body, http::Request, routing::get, Router};
        use http_body_util::BodyExt;
        use serde::Deserialize;
        use tower::ServiceExt;

        #[derive(Deserialize)]
        struct Page {
            page: u32,
        }

        let app = Router::new()
            .route(
                "/items/:id",
                get(|ApiPath(id): ApiPath<i32>| async move { id.to_string() }),
            )
            .route(
                "/items",
                get(|ApiQuery(p): ApiQuery<Page>| async move { p.page.to_string() }),
            );

        for uri in ["/items/abc", "/items?page=first"] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert!(body["detail"].is_string(), "{}", uri);
        }

        let response = app
            .oneshot(Request::get("/items/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
