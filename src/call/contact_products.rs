use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use uuid::Uuid;

use super::contacts::caller_profile_id;
use super::types::{ContactProduct, ContactProductView, CreateContactProductRequest};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath, FieldErrors};
use crate::core::shared::schema::{contact_products, contacts, products};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::institution::access::require_member;
use crate::security::auth::AuthenticatedUser;

type ContactProductRow = (ContactProduct, String, String, String, String, i32);

fn view_from_row(row: ContactProductRow) -> (ContactProductView, i32) {
    let (link, contact_name, phone_number, contact_status, product_name, institution_id) = row;
    (
        ContactProductView {
            link,
            contact_name,
            phone_number,
            contact_status,
            product_name,
        },
        institution_id,
    )
}

/// Loads contact products joined with their contact and product.
///
/// Each view is paired with the owning institution of its contact.
pub(crate) fn contact_product_views(
    conn: &mut PgConnection,
    uuids: Option<&[Uuid]>,
    institution_id: Option<i32>,
) -> Result<Vec<(ContactProductView, i32)>, ApiError> {
    let mut query = contact_products::table
        .inner_join(contacts::table)
        .inner_join(products::table)
        .select((
            ContactProduct::as_select(),
            contacts::name,
            contacts::phone_number,
            contacts::status,
            products::name,
            contacts::institution_id,
        ))
        .order(contact_products::created_at.desc())
        .into_boxed();

    if let Some(uuids) = uuids {
        query = query.filter(contact_products::uuid.eq_any(uuids.to_vec()));
    }
    if let Some(institution_id) = institution_id {
        query = query.filter(contacts::institution_id.eq(institution_id));
    }

    let rows: Vec<ContactProductRow> = query.load(conn)?;
    Ok(rows.into_iter().map(view_from_row).collect())
}

pub(crate) fn load_contact_product_view(
    conn: &mut PgConnection,
    uuid: Uuid,
) -> Result<(ContactProductView, i32), ApiError> {
    contact_product_views(conn, Some(&[uuid]), None)?
        .pop()
        .ok_or_else(|| ApiError::NotFound("Contact product not found.".into()))
}

pub async fn list_contact_products(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<ContactProductView>>, ApiError> {
    let views = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        contact_product_views(conn, None, Some(institution_id))
    })
    .await?;
    Ok(Json(views.into_iter().map(|(view, _)| view).collect()))
}

pub async fn create_contact_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiJson(req): ApiJson<CreateContactProductRequest>,
) -> Result<(StatusCode, Json<ContactProductView>), ApiError> {
    let view = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;

        let mut errors = FieldErrors::new();
        let contact_institution: Option<i32> = contacts::table
            .find(req.contact)
            .select(contacts::institution_id)
            .first(conn)
            .optional()?;
        if contact_institution != Some(institution_id) {
            errors.add("contact", "Contact does not belong to this institution.");
        }
        let product_institution: Option<i32> = products::table
            .find(req.product)
            .select(products::institution_id)
            .first(conn)
            .optional()?;
        if product_institution != Some(institution_id) {
            errors.add("product", "Product does not belong to this institution.");
        }
        errors.into_result()?;

        let link = ContactProduct {
            uuid: Uuid::new_v4(),
            contact_uuid: req.contact,
            product_uuid: req.product,
            created_by: caller_profile_id(conn, &auth)?,
            created_at: Utc::now(),
        };
        diesel::insert_into(contact_products::table)
            .values(&link)
            .execute(conn)?;
        load_contact_product_view(conn, link.uuid).map(|(view, _)| view)
    })
    .await?;

    info!(
        "Linked contact {} to product {}",
        view.link.contact_uuid, view.link.product_uuid
    );
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_contact_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<Json<ContactProductView>, ApiError> {
    let view = with_conn(&state.conn, move |conn| {
        let (view, institution_id) = load_contact_product_view(conn, uuid)?;
        require_member(conn, &auth, institution_id)?;
        Ok(view)
    })
    .await?;
    Ok(Json(view))
}

pub async fn delete_contact_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        let (_, institution_id) = load_contact_product_view(conn, uuid)?;
        require_member(conn, &auth, institution_id)?;
        diesel::delete(contact_products::table.find(uuid)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Deleted contact product {}", uuid);
    Ok(StatusCode::NO_CONTENT)
}
