pub mod handlers;
pub mod service;
pub mod types;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use types::{Profile, ProfileView, User, UserView};

pub fn configure_user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(ApiUrls::USER_REGISTER, post(handlers::register))
        .route(ApiUrls::USER_LOGIN, post(handlers::login))
        .route(ApiUrls::USER_ME, get(handlers::me))
        .route(
            ApiUrls::USER_BY_ID,
            get(handlers::get_user_by_id)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
