//! Call-center operations: contacts, agents, call groups and call records.

pub mod agents;
pub mod calls;
pub mod contact_products;
pub mod contacts;
pub mod feedback;
pub mod group_agents;
pub mod group_contacts;
pub mod groups;
pub mod spreadsheet;
pub mod status;
pub mod types;
pub mod uploads;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::shared::state::AppState;
use crate::core::urls::ApiUrls;

pub use status::{CallStatus, ContactStatus};

pub fn configure_call_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            ApiUrls::CALL_GROUPS,
            get(groups::list_groups).post(groups::create_group),
        )
        .route(ApiUrls::MY_CALL_GROUPS, get(groups::list_my_groups))
        .route(
            ApiUrls::CALL_GROUP_BY_ID,
            get(groups::get_group)
                .patch(groups::update_group)
                .delete(groups::delete_group),
        )
        .route(
            ApiUrls::CALL_GROUP_CONTACTS,
            get(groups::list_group_contacts).post(groups::add_group_contacts),
        )
        .route(
            ApiUrls::CALL_GROUP_AGENTS,
            get(group_agents::list_group_agents).post(group_agents::create_group_agent),
        )
        .route(
            ApiUrls::CALL_GROUP_AGENT_BY_ID,
            get(group_agents::get_group_agent)
                .patch(group_agents::update_group_agent)
                .delete(group_agents::delete_group_agent),
        )
        .route(
            ApiUrls::GROUP_CONTACTS,
            get(group_contacts::list_group_contacts).post(group_contacts::create_group_contact),
        )
        .route(
            ApiUrls::GROUP_CONTACT_BY_ID,
            get(group_contacts::get_group_contact)
                .patch(group_contacts::update_group_contact)
                .delete(group_contacts::delete_group_contact),
        )
        .route(
            ApiUrls::CONTACTS,
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route(ApiUrls::CONTACTS_EXPORT, get(spreadsheet::export_contacts))
        .route(
            ApiUrls::CONTACT_BY_ID,
            get(contacts::get_contact)
                .patch(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .route(ApiUrls::CONTACT_TEMPLATE, get(spreadsheet::download_template))
        .route(ApiUrls::CONTACT_BULK_UPLOAD, post(spreadsheet::bulk_upload))
        .route(
            ApiUrls::CONTACT_PRODUCTS,
            get(contact_products::list_contact_products)
                .post(contact_products::create_contact_product),
        )
        .route(
            ApiUrls::CONTACT_PRODUCT_BY_ID,
            get(contact_products::get_contact_product)
                .delete(contact_products::delete_contact_product),
        )
        .route(
            ApiUrls::AGENTS,
            get(agents::list_agents).post(agents::create_agent),
        )
        .route(
            ApiUrls::AGENT_BY_ID,
            get(agents::get_agent)
                .patch(agents::update_agent)
                .delete(agents::delete_agent),
        )
        .route(
            ApiUrls::CALLS,
            get(calls::list_calls).post(calls::create_call),
        )
        .route(
            ApiUrls::CALL_BY_ID,
            get(calls::get_call)
                .patch(calls::update_call)
                .delete(calls::delete_call),
        )
        .route(ApiUrls::CONTACT_CALLS, get(calls::list_contact_calls))
        .route(ApiUrls::AGENT_CALLS, get(calls::list_agent_calls))
        .route(ApiUrls::AGENT_GROUPS, get(calls::list_agent_groups))
}
