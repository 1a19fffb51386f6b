use std::collections::HashMap;
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

use super::status::ContactStatus;
use super::types::{
    Contact, ContactChanges, ContactFilters, ContactProduct, ContactView, CreateContactRequest,
    GroupRef, ProductRef, UpdateContactRequest,
};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath, ApiQuery, FieldErrors};
use crate::core::shared::schema::{
    call_group_contacts, call_groups, calls, contact_products, contacts, products,
};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::institution::access::require_member;
use crate::security::auth::AuthenticatedUser;
use crate::users::service::profile_for_user;

pub fn load_contact(conn: &mut PgConnection, uuid: Uuid) -> Result<Contact, ApiError> {
    contacts::table
        .find(uuid)
        .select(Contact::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Contact not found.".into()))
}

fn lock_contact(conn: &mut PgConnection, uuid: Uuid) -> Result<Contact, ApiError> {
    contacts::table
        .find(uuid)
        .select(Contact::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Contact not found.".into()))
}

/// Writes `changes` only while the contact still has the status it was read with.
pub fn save_contact_changes(
    conn: &mut PgConnection,
    read: &Contact,
    changes: &ContactChanges,
) -> Result<Contact, ApiError> {
    diesel::update(
        contacts::table
            .find(read.uuid)
            .filter(contacts::status.eq(&read.status)),
    )
    .set(changes)
    .returning(Contact::as_returning())
    .get_result(conn)
    .optional()?
    .ok_or_else(|| {
        ApiError::Conflict("Contact status changed during the update. Please retry.".into())
    })
}

pub(crate) fn caller_profile_id(
    conn: &mut PgConnection,
    auth: &AuthenticatedUser,
) -> Result<Option<i32>, ApiError> {
    Ok(profile_for_user(conn, auth.user_id)?.map(|p| p.id))
}

/// Product of `institution_id` addressed by a raw UUID string.
fn institution_product(
    conn: &mut PgConnection,
    institution_id: i32,
    raw: &str,
) -> Result<Option<Uuid>, ApiError> {
    let Ok(uuid) = Uuid::parse_str(raw.trim()) else {
        return Ok(None);
    };
    products::table
        .filter(products::uuid.eq(uuid))
        .filter(products::institution_id.eq(institution_id))
        .select(products::uuid)
        .first(conn)
        .optional()
        .map_err(ApiError::from)
}

/// Attaches products, call counts and call groups to each contact.
pub(crate) fn contact_views(
    conn: &mut PgConnection,
    rows: Vec<Contact>,
) -> Result<Vec<ContactView>, ApiError> {
    let uuids: Vec<Uuid> = rows.iter().map(|c| c.uuid).collect();

    let mut product_refs: HashMap<Uuid, Vec<ProductRef>> = HashMap::new();
    let links: Vec<(Uuid, Uuid, Uuid, String)> = contact_products::table
        .inner_join(products::table)
        .filter(contact_products::contact_uuid.eq_any(&uuids))
        .select((
            contact_products::uuid,
            contact_products::contact_uuid,
            products::uuid,
            products::name,
        ))
        .order(contact_products::created_at.asc())
        .load(conn)?;
    for (link, contact, product, product_name) in links {
        product_refs.entry(contact).or_default().push(ProductRef {
            contact_product: link,
            product,
            product_name,
        });
    }

    let mut call_counts: HashMap<Uuid, i64> = HashMap::new();
    let called: Vec<Uuid> = calls::table
        .inner_join(contact_products::table)
        .filter(contact_products::contact_uuid.eq_any(&uuids))
        .select(contact_products::contact_uuid)
        .load(conn)?;
    for contact in called {
        *call_counts.entry(contact).or_default() += 1;
    }

    let mut group_refs: HashMap<Uuid, Vec<GroupRef>> = HashMap::new();
    let memberships: Vec<(Uuid, Uuid, String)> = call_group_contacts::table
        .inner_join(contact_products::table)
        .inner_join(call_groups::table)
        .filter(contact_products::contact_uuid.eq_any(&uuids))
        .select((
            contact_products::contact_uuid,
            call_groups::uuid,
            call_groups::name,
        ))
        .load(conn)?;
    for (contact, uuid, name) in memberships {
        let groups = group_refs.entry(contact).or_default();
        if !groups.iter().any(|g| g.uuid == uuid) {
            groups.push(GroupRef { uuid, name });
        }
    }

    Ok(rows
        .into_iter()
        .map(|contact| ContactView {
            products: product_refs.remove(&contact.uuid).unwrap_or_default(),
            call_count: call_counts.get(&contact.uuid).copied().unwrap_or(0),
            call_groups: group_refs.remove(&contact.uuid).unwrap_or_default(),
            contact,
        })
        .collect())
}

fn contact_view(conn: &mut PgConnection, contact: Contact) -> Result<ContactView, ApiError> {
    contact_views(conn, vec![contact])?
        .pop()
        .ok_or_else(|| ApiError::Internal("Contact view was not built".into()))
}

pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiQuery(filters): ApiQuery<ContactFilters>,
) -> Result<Json<Vec<ContactView>>, ApiError> {
    let status = match non_blank(filters.status) {
        Some(raw) => Some(ContactStatus::parse(&raw).ok_or_else(|| {
            ApiError::field("status", format!("Invalid status '{}'.", raw))
        })?),
        None => None,
    };

    let views = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;

        let mut query = contacts::table
            .filter(contacts::institution_id.eq(institution_id))
            .select(Contact::as_select())
            .order(contacts::created_at.desc())
            .into_boxed();

        if let Some(status) = status {
            query = query.filter(contacts::status.eq(status.as_str()));
        }
        if let Some(product) = filters.product {
            query = query.filter(
                contacts::uuid.eq_any(
                    contact_products::table
                        .filter(contact_products::product_uuid.eq(product))
                        .select(contact_products::contact_uuid),
                ),
            );
        }
        if let Some(term) = non_blank(filters.search) {
            let pattern = format!("%{}%", term);
            query = query.filter(
                contacts::name
                    .ilike(pattern.clone())
                    .or(contacts::phone_number.ilike(pattern)),
            );
        }

        let rows = query.load(conn)?;
        contact_views(conn, rows)
    })
    .await?;

    Ok(Json(views))
}

pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiJson(req): ApiJson<CreateContactRequest>,
) -> Result<(StatusCode, Json<ContactView>), ApiError> {
    let name = non_blank(req.name);
    let phone_number = non_blank(req.phone_number);

    let mut errors = FieldErrors::new();
    if name.is_none() {
        errors.add("name", "Name is required");
    }
    if phone_number.is_none() {
        errors.add("phone_number", "Phone number is required");
    }

    let view = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;

        let product = match non_blank(req.product) {
            Some(raw) => {
                let found = institution_product(conn, institution_id, &raw)?;
                if found.is_none() {
                    errors.add("product", "Invalid product UUID");
                }
                found
            }
            None => None,
        };
        errors.into_result()?;

        let profile_id = caller_profile_id(conn, &auth)?;
        let now = Utc::now();
        let contact = Contact {
            uuid: Uuid::new_v4(),
            institution_id,
            name: name.unwrap_or_default(),
            phone_number: phone_number.unwrap_or_default(),
            country: non_blank(req.country),
            country_code: non_blank(req.country_code),
            status: req.status.unwrap_or(ContactStatus::New).as_str().to_string(),
            remarks: non_blank(req.remarks),
            created_at: now,
            updated_at: now,
        };

        conn.transaction(|conn| {
            diesel::insert_into(contacts::table)
                .values(&contact)
                .execute(conn)?;
            if let Some(product_uuid) = product {
                diesel::insert_into(contact_products::table)
                    .values(&ContactProduct {
                        uuid: Uuid::new_v4(),
                        contact_uuid: contact.uuid,
                        product_uuid,
                        created_by: profile_id,
                        created_at: now,
                    })
                    .execute(conn)?;
            }
            Ok::<_, ApiError>(())
        })?;

        contact_view(conn, contact)
    })
    .await?;

    info!(
        "Created contact {} in institution {}",
        view.contact.uuid, view.contact.institution_id
    );
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<Json<ContactView>, ApiError> {
    let view = with_conn(&state.conn, move |conn| {
        let contact = load_contact(conn, uuid)?;
        require_member(conn, &auth, contact.institution_id)?;
        contact_view(conn, contact)
    })
    .await?;
    Ok(Json(view))
}

pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateContactRequest>,
) -> Result<Json<ContactView>, ApiError> {
    let mut errors = FieldErrors::new();
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        errors.add("name", "Name is required");
    }
    if req.phone_number.as_deref().is_some_and(|p| p.trim().is_empty()) {
        errors.add("phone_number", "Phone number is required");
    }
    errors.into_result()?;

    let view = with_conn(&state.conn, move |conn| {
        conn.transaction(|conn| {
            let contact = lock_contact(conn, uuid)?;
            require_member(conn, &auth, contact.institution_id)?;

            let status = match req.status {
                Some(next) => Some(contact.contact_status().transition(next)?),
                None => None,
            };

            let changes = ContactChanges {
                name: req.name.map(|n| n.trim().to_string()),
                phone_number: req.phone_number.map(|p| p.trim().to_string()),
                country: req.country,
                country_code: req.country_code,
                status: status.map(|s| s.as_str().to_string()),
                remarks: req.remarks,
                updated_at: Utc::now(),
            };
            let contact = save_contact_changes(conn, &contact, &changes)?;
            contact_view(conn, contact)
        })
    })
    .await?;

    info!("Updated contact {} ({})", view.contact.uuid, view.contact.status);
    Ok(Json(view))
}

pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        let contact = load_contact(conn, uuid)?;
        require_member(conn, &auth, contact.institution_id)?;
        diesel::delete(contacts::table.find(uuid)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Deleted contact {}", uuid);
    Ok(StatusCode::NO_CONTENT)
}
