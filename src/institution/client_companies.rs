use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use rand::{distr::Alphanumeric, Rng};
use uuid::Uuid;

use super::access::{require_member, require_owner};
use super::types::{
    ClientCompany, ClientCompanyChanges, ClientCompanyProduct, ClientCompanyProductView,
    CompanyStatus, CreateClientCompanyProductRequest, CreateClientCompanyRequest, Product,
    UpdateClientCompanyRequest,
};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath, FieldErrors};
use crate::core::shared::schema::{client_companies, client_company_products, products};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::security::auth::AuthenticatedUser;
use crate::security::validation::{is_valid_email, is_valid_url};

pub const API_KEY_LENGTH: usize = 32;

pub fn generate_api_key() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LENGTH)
        .map(char::from)
        .collect()
}

fn unique_api_key(conn: &mut PgConnection) -> Result<String, ApiError> {
    for _ in 0..5 {
        let key = generate_api_key();
        let taken: i64 = client_companies::table
            .filter(client_companies::api_key.eq(&key))
            .count()
            .get_result(conn)?;
        if taken == 0 {
            return Ok(key);
        }
    }
    Err(ApiError::Internal("Could not generate a unique API key".into()))
}

fn validate_company_fields(errors: &mut FieldErrors, email: Option<&str>, callback_url: Option<&str>) {
    if email.is_some_and(|e| !is_valid_email(e)) {
        errors.add("contact_email", "Enter a valid email address.");
    }
    if callback_url.is_some_and(|u| !is_valid_url(u)) {
        errors.add("callback_url", "Enter a valid URL.");
    }
}

fn load_company(conn: &mut PgConnection, uuid: Uuid) -> Result<ClientCompany, ApiError> {
    client_companies::table
        .find(uuid)
        .select(ClientCompany::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Client company not found.".into()))
}

pub async fn list_client_companies(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<ClientCompany>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        client_companies::table
            .filter(client_companies::institution_id.eq(institution_id))
            .select(ClientCompany::as_select())
            .order(client_companies::created_at.desc())
            .load(conn)
            .map_err(ApiError::from)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn create_client_company(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiJson(req): ApiJson<CreateClientCompanyRequest>,
) -> Result<(StatusCode, Json<ClientCompany>), ApiError> {
    let mut errors = FieldErrors::new();
    let company_name = req.company_name.trim().to_string();
    if company_name.is_empty() {
        errors.add("company_name", "Company name is required.");
    }
    let contact_email = non_blank(req.contact_email);
    let callback_url = non_blank(req.callback_url);
    validate_company_fields(&mut errors, contact_email.as_deref(), callback_url.as_deref());
    errors.into_result()?;

    let company = with_conn(&state.conn, move |conn| {
        require_owner(conn, &auth, institution_id)?;
        let now = Utc::now();
        let company = ClientCompany {
            uuid: Uuid::new_v4(),
            institution_id,
            company_name,
            contact_email,
            contact_phone: non_blank(req.contact_phone),
            status: req.status.unwrap_or(CompanyStatus::Active).as_str().to_string(),
            created_by: Some(auth.user_id),
            created_at: now,
            updated_at: now,
            has_system: req.has_system,
            callback_url,
            api_key: unique_api_key(conn)?,
        };
        diesel::insert_into(client_companies::table)
            .values(&company)
            .execute(conn)?;
        Ok(company)
    })
    .await?;

    info!(
        "Created client company {} for institution {}",
        company.uuid, company.institution_id
    );
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn get_client_company(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<Json<ClientCompany>, ApiError> {
    let company = with_conn(&state.conn, move |conn| {
        let company = load_company(conn, uuid)?;
        require_member(conn, &auth, company.institution_id)?;
        Ok(company)
    })
    .await?;
    Ok(Json(company))
}

pub async fn update_client_company(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateClientCompanyRequest>,
) -> Result<Json<ClientCompany>, ApiError> {
    let mut errors = FieldErrors::new();
    if req.company_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        errors.add("company_name", "Company name is required.");
    }
    validate_company_fields(&mut errors, req.contact_email.as_deref(), req.callback_url.as_deref());
    errors.into_result()?;

    let company = with_conn(&state.conn, move |conn| {
        let company = load_company(conn, uuid)?;
        require_owner(conn, &auth, company.institution_id)?;
        let api_key = if req.regenerate_api_key {
            Some(unique_api_key(conn)?)
        } else {
            None
        };
        diesel::update(client_companies::table.find(uuid))
            .set(&ClientCompanyChanges {
                company_name: req.company_name.map(|n| n.trim().to_string()),
                contact_email: req.contact_email,
                contact_phone: req.contact_phone,
                status: req.status.map(|s| s.as_str().to_string()),
                has_system: req.has_system,
                callback_url: req.callback_url,
                api_key,
                updated_at: Utc::now(),
            })
            .returning(ClientCompany::as_returning())
            .get_result(conn)
            .map_err(ApiError::from)
    })
    .await?;

    info!("Updated client company {}", company.uuid);
    Ok(Json(company))
}

pub async fn delete_client_company(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        let company = load_company(conn, uuid)?;
        require_owner(conn, &auth, company.institution_id)?;
        diesel::delete(client_companies::table.find(uuid)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Deleted client company {}", uuid);
    Ok(StatusCode::NO_CONTENT)
}

// ===== Client company products =====

fn company_product_view(
    conn: &mut PgConnection,
    link: ClientCompanyProduct,
) -> Result<ClientCompanyProductView, ApiError> {
    let company_name = client_companies::table
        .find(link.client_company_uuid)
        .select(client_companies::company_name)
        .first(conn)?;
    let product_name = products::table
        .find(link.product_uuid)
        .select(products::name)
        .first(conn)?;
    Ok(ClientCompanyProductView {
        link,
        company_name,
        product_name,
    })
}

fn load_company_product(
    conn: &mut PgConnection,
    uuid: Uuid,
) -> Result<(ClientCompanyProduct, i32), ApiError> {
    client_company_products::table
        .inner_join(client_companies::table)
        .filter(client_company_products::uuid.eq(uuid))
        .select((
            ClientCompanyProduct::as_select(),
            client_companies::institution_id,
        ))
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Client company product not found.".into()))
}

pub async fn list_client_company_products(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<ClientCompanyProductView>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        let rows: Vec<(ClientCompanyProduct, String, String)> = client_company_products::table
            .inner_join(client_companies::table)
            .inner_join(products::table)
            .filter(client_companies::institution_id.eq(institution_id))
            .select((
                ClientCompanyProduct::as_select(),
                client_companies::company_name,
                products::name,
            ))
            .order(client_company_products::created_at.desc())
            .load(conn)?;
        Ok(rows
            .into_iter()
            .map(|(link, company_name, product_name)| ClientCompanyProductView {
                link,
                company_name,
                product_name,
            })
            .collect::<Vec<_>>())
    })
    .await?;
    Ok(Json(rows))
}

pub async fn create_client_company_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiJson(req): ApiJson<CreateClientCompanyProductRequest>,
) -> Result<(StatusCode, Json<ClientCompanyProductView>), ApiError> {
    let view = with_conn(&state.conn, move |conn| {
        require_owner(conn, &auth, institution_id)?;

        let mut errors = FieldErrors::new();
        let company = client_companies::table
            .find(req.client_company)
            .select(ClientCompany::as_select())
            .first(conn)
            .optional()?;
        if company.map(|c| c.institution_id) != Some(institution_id) {
            errors.add(
                "client_company",
                "Client company does not belong to this institution.",
            );
        }
        let product = products::table
            .find(req.product)
            .select(Product::as_select())
            .first(conn)
            .optional()?;
        if product.map(|p| p.institution_id) != Some(institution_id) {
            errors.add("product", "Product does not belong to this institution.");
        }
        errors.into_result()?;

        let link = ClientCompanyProduct {
            uuid: Uuid::new_v4(),
            client_company_uuid: req.client_company,
            product_uuid: req.product,
            created_at: Utc::now(),
            created_by: Some(auth.user_id),
        };
        diesel::insert_into(client_company_products::table)
            .values(&link)
            .execute(conn)?;
        company_product_view(conn, link)
    })
    .await?;

    info!(
        "Linked product {} to client company {}",
        view.link.product_uuid, view.link.client_company_uuid
    );
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_client_company_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<Json<ClientCompanyProductView>, ApiError> {
    let view = with_conn(&state.conn, move |conn| {
        let (link, institution_id) = load_company_product(conn, uuid)?;
        require_member(conn, &auth, institution_id)?;
        company_product_view(conn, link)
    })
    .await?;
    Ok(Json(view))
}

pub async fn delete_client_company_product(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        let (_, institution_id) = load_company_product(conn, uuid)?;
        require_owner(conn, &auth, institution_id)?;
        diesel::delete(client_company_products::table.find(uuid)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Deleted client company product {}", uuid);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_api_key_shape() {
        let key = generate_api_key();
        assert_eq!(key.len(), API_KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_api_keys_differ() {
        let keys: HashSet<String> = (0..100).map(|_| generate_api_key()).collect();
        assert_eq!(keys.len(), 100);
    }

    #[test]
    fn test_company_field_validation() {
        let mut errors = FieldErrors::new();
        validate_company_fields(&mut errors, Some("ops@client.com"), Some("https://client.com/hook"));
        assert!(errors.is_empty());

        validate_company_fields(&mut errors, Some("ops"), Some("client.com"));
        assert!(errors.get("contact_email").is_some());
        assert!(errors.get("callback_url").is_some());
    }
}
