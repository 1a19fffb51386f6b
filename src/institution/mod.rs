pub mod access;
pub mod branches;
pub mod client_companies;
pub mod feedback_fields;
pub mod institutions;
pub mod products;
pub mod profiles;
pub mod types;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use feedback_fields::{FeedbackField, FeedbackSchema, FieldType};
pub use types::{Institution, Product};

pub fn configure_institution_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            ApiUrls::INSTITUTIONS,
            get(institutions::list_institutions).post(institutions::create_institution),
        )
        .route(
            ApiUrls::INSTITUTION_BY_ID,
            get(institutions::get_institution)
                .patch(institutions::update_institution)
                .delete(institutions::delete_institution),
        )
        .route(
            ApiUrls::INSTITUTION_BRANCHES,
            get(branches::list_institution_branches),
        )
        .route(
            ApiUrls::BRANCHES,
            get(branches::list_branches).post(branches::create_branch),
        )
        .route(
            ApiUrls::BRANCH_BY_ID,
            get(branches::get_branch)
                .patch(branches::update_branch)
                .delete(branches::delete_branch),
        )
        .route(
            ApiUrls::USER_BRANCHES,
            get(branches::list_user_branches).post(branches::create_user_branch),
        )
        .route(
            ApiUrls::USER_BRANCH_BY_ID,
            get(branches::get_user_branch)
                .patch(branches::update_user_branch)
                .delete(branches::delete_user_branch),
        )
        .route(
            ApiUrls::USER_BRANCH_BY_IDS,
            delete(branches::delete_user_branch_by_ids),
        )
        .route(ApiUrls::PROFILES, post(profiles::create_profile))
        .route(
            ApiUrls::INSTITUTION_PROFILES,
            get(profiles::list_institution_profiles),
        )
        .route(
            ApiUrls::PROFILE_BY_USER,
            get(profiles::get_user_profile).patch(profiles::update_user_profile),
        )
        .route(
            ApiUrls::CLIENT_COMPANIES,
            get(client_companies::list_client_companies)
                .post(client_companies::create_client_company),
        )
        .route(
            ApiUrls::CLIENT_COMPANY_BY_ID,
            get(client_companies::get_client_company)
                .patch(client_companies::update_client_company)
                .delete(client_companies::delete_client_company),
        )
        .route(
            ApiUrls::CLIENT_COMPANY_PRODUCTS,
            get(client_companies::list_client_company_products)
                .post(client_companies::create_client_company_product),
        )
        .route(
            ApiUrls::CLIENT_COMPANY_PRODUCT_BY_ID,
            get(client_companies::get_client_company_product)
                .delete(client_companies::delete_client_company_product),
        )
        .route(
            ApiUrls::PRODUCTS,
            get(products::list_products).post(products::create_product),
        )
        .route(
            ApiUrls::PRODUCT_BY_ID,
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
}
