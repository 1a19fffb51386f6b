use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::status::{ActiveStatus, CallStatus, ContactStatus, GroupContactStatus};
use crate::core::shared::schema::{
    agents, call_group_agents, call_group_contacts, call_groups, calls, contact_products,
    contacts,
};

// ===== Contacts =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = contacts, primary_key(uuid), check_for_backend(diesel::pg::Pg))]
pub struct Contact {
    pub uuid: Uuid,
    #[serde(rename = "institution")]
    pub institution_id: i32,
    pub name: String,
    pub phone_number: String,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub status: String,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn contact_status(&self) -> ContactStatus {
        ContactStatus::parse(&self.status).unwrap_or(ContactStatus::New)
    }
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = contacts)]
pub struct ContactChanges {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub status: Option<String>,
    pub remarks: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub status: Option<ContactStatus>,
    pub remarks: Option<String>,
    pub product: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateContactRequest {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub status: Option<ContactStatus>,
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactFilters {
    pub status: Option<String>,
    pub product: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupRef {
    pub uuid: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductRef {
    pub contact_product: Uuid,
    pub product: Uuid,
    pub product_name: String,
}

#[derive(Debug, Serialize)]
pub struct ContactView {
    #[serde(flatten)]
    pub contact: Contact,
    pub products: Vec<ProductRef>,
    pub call_count: i64,
    pub call_groups: Vec<GroupRef>,
}

// ===== Contact products =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = contact_products, primary_key(uuid), check_for_backend(diesel::pg::Pg))]
pub struct ContactProduct {
    pub uuid: Uuid,
    #[serde(rename = "contact")]
    pub contact_uuid: Uuid,
    #[serde(rename = "product")]
    pub product_uuid: Uuid,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateContactProductRequest {
    pub contact: Uuid,
    pub product: Uuid,
}

/// A contact product with the names needed to display it.
#[derive(Debug, Clone, Serialize)]
pub struct ContactProductView {
    #[serde(flatten)]
    pub link: ContactProduct,
    pub contact_name: String,
    pub phone_number: String,
    pub contact_status: String,
    pub product_name: String,
}

// ===== Agents =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = agents, primary_key(uuid), check_for_backend(diesel::pg::Pg))]
pub struct Agent {
    pub uuid: Uuid,
    #[serde(rename = "profile")]
    pub profile_id: i32,
    #[serde(rename = "institution")]
    pub institution_id: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub profile: i32,
    pub status: Option<ActiveStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgentRequest {
    pub status: Option<ActiveStatus>,
}

#[derive(Debug, Serialize)]
pub struct AgentView {
    #[serde(flatten)]
    pub agent: Agent,
    pub user: i32,
    pub fullname: String,
    pub email: String,
}

// ===== Call groups =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = call_groups, primary_key(uuid), check_for_backend(diesel::pg::Pg))]
pub struct CallGroup {
    pub uuid: Uuid,
    #[serde(rename = "institution")]
    pub institution_id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CallGroupRequest {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupContactEntry {
    pub group_contact: Uuid,
    pub contact_product: Uuid,
    pub contact: Uuid,
    pub name: String,
    pub phone_number: String,
    pub contact_status: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CallGroupView {
    #[serde(flatten)]
    pub group: CallGroup,
    pub contacts: Vec<GroupContactEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AddGroupContactsRequest {
    pub contact_products: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AddGroupContactsResponse {
    pub added_count: usize,
    pub skipped_count: usize,
    pub added: Vec<CallGroupContact>,
}

// ===== Call group agents =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = call_group_agents, primary_key(uuid), check_for_backend(diesel::pg::Pg))]
pub struct CallGroupAgent {
    pub uuid: Uuid,
    #[serde(rename = "call_group")]
    pub call_group_uuid: Uuid,
    #[serde(rename = "agent")]
    pub agent_uuid: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCallGroupAgentRequest {
    pub call_group: Uuid,
    pub agent: Uuid,
    pub status: Option<ActiveStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest<S> {
    pub status: Option<S>,
}

// ===== Call group contacts =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = call_group_contacts, primary_key(uuid), check_for_backend(diesel::pg::Pg))]
pub struct CallGroupContact {
    pub uuid: Uuid,
    #[serde(rename = "call_group")]
    pub call_group_uuid: Uuid,
    #[serde(rename = "contact_product")]
    pub contact_product_uuid: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupContactRequest {
    pub call_group: Uuid,
    pub contact_product: Uuid,
    pub status: Option<GroupContactStatus>,
}

// ===== Calls =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = calls, primary_key(uuid), check_for_backend(diesel::pg::Pg))]
pub struct Call {
    pub uuid: Uuid,
    #[serde(rename = "contact")]
    pub contact_product_uuid: Uuid,
    pub feedback: Value,
    pub status: String,
    pub made_by: Option<i32>,
    pub made_on: DateTime<Utc>,
}

impl Call {
    pub fn call_status(&self) -> Option<CallStatus> {
        CallStatus::parse(&self.status)
    }
}

#[derive(Debug, Serialize)]
pub struct CallView {
    #[serde(flatten)]
    pub call: Call,
    pub contact_name: String,
    pub phone_number: String,
    pub product: Uuid,
    pub product_name: String,
    pub made_by_name: Option<String>,
}
