use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde_json::Value;
use uuid::Uuid;

use super::access::{require_member, require_owner};
use super::feedback_fields::FeedbackSchema;
use super::types::{CreateProductRequest, Product, ProductChanges, ProductStatus, UpdateProductRequest};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath, FieldErrors};
use crate::core::shared::schema::products;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::security::auth::AuthenticatedUser;

fn check_feedback_fields(errors: &mut FieldErrors, value: Option<&Value>) {
    if let Some(value) = value {
        if let Err(msg) = FeedbackSchema::parse(value) {
            errors.add("feedback_fields", msg);
        }
    }
}

pub(crate) fn load_product(conn: &mut PgConnection, uuid: Uuid) -> Result<Product, ApiError> {
    products::table
        .find(uuid)
        .select(Product::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Product not found.".into()))
}

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        products::table
            .filter(products::institution_id.eq(institution_id))
            .select(Product::as_select())
            .order(products::created_at.desc())
            .load(conn)
            .map_err(ApiError::from)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let mut errors = FieldErrors::new();
    let name = req.name.trim().to_string();
    if name.is_empty() {
        errors.add("name", "Product name is required.");
    }
    check_feedback_fields(&mut errors, req.feedback_fields.as_ref());
    errors.into_result()?;

    let product = with_conn(&state.conn, move |conn| {
        require_owner(conn, &auth, institution_id)?;
        let now = Utc::now();
        let product = Product {
            uuid: Uuid::new_v4(),
            institution_id,
            name,
            descriptions: non_blank(req.descriptions),
            status: req.status.unwrap_or(ProductStatus::Active).as_str().to_string(),
            feedback_fields: req.feedback_fields.unwrap_or_else(|| Value::Array(Vec::new())),
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(products::table)
            .values(&product)
            .execute(conn)?;
        Ok(product)
    })
    .await?;

    info!(
        "Created product {} '{}' for institution {}",
        product.uuid, product.name, product.institution_id
    );
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = with_conn(&state.conn, move |conn| {
        let product = load_product(conn, uuid)?;
        require_member(conn, &auth, product.institution_id)?;
        Ok(product)
    })
    .await?;
    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let mut errors = FieldErrors::new();
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        errors.add("name", "Product name is required.");
    }
    check_feedback_fields(&mut errors, req.feedback_fields.as_ref());
    errors.into_result()?;

    let product = with_conn(&state.conn, move |conn| {
        let product = load_product(conn, uuid)?;
        require_owner(conn, &auth, product.institution_id)?;
        diesel::update(products::table.find(uuid))
            .set(&ProductChanges {
                name: req.name.map(|n| n.trim().to_string()),
                descriptions: req.descriptions,
                status: req.status.map(|s| s.as_str().to_string()),
                feedback_fields: req.feedback_fields,
                updated_at: Utc::now(),
            })
            .returning(Product::as_returning())
            .get_result(conn)
            .map_err(ApiError::from)
    })
    .await?;

    info!("Updated product {}", product.uuid);
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        let product = load_product(conn, uuid)?;
        require_owner(conn, &auth, product.institution_id)?;
        diesel::delete(products::table.find(uuid)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Deleted product {}", uuid);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feedback_fields_errors_are_keyed() {
        let mut errors = FieldErrors::new();
        check_feedback_fields(&mut errors, Some(&json!([{"name": "x", "type": "select"}])));
        assert_eq!(
            errors.get("feedback_fields"),
            Some(&["Select fields must have 'options'.".to_string()][..])
        );
    }

    #[test]
    fn test_missing_feedback_fields_is_fine() {
        let mut errors = FieldErrors::new();
        check_feedback_fields(&mut errors, None);
        check_feedback_fields(&mut errors, Some(&json!([])));
        assert!(errors.is_empty());
    }
}
