use chrono::{DateTime, NaiveTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::schema::{
    branches, client_companies, client_company_products, institutions, products, user_branches,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    UnderReview,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::UnderReview => "under_review",
        }
    }

    pub fn display(value: &str) -> &'static str {
        match value {
            "pending" => "Pending Approval",
            "approved" => "Approved",
            "rejected" => "Rejected",
            "under_review" => "Under Review",
            _ => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Active,
    Inactive,
    Pending,
    Suspended,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
            Self::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Disabled,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }
}

// ===== Institutions =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = institutions, check_for_backend(diesel::pg::Pg))]
pub struct Institution {
    pub id: i32,
    #[serde(rename = "institution_owner_id")]
    pub owner_id: i32,
    pub institution_email: Option<String>,
    pub institution_name: String,
    pub first_phone_number: Option<String>,
    pub second_phone_number: Option<String>,
    pub institution_logo: Option<String>,
    pub theme_color: Option<String>,
    pub setup: bool,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub approval_status: String,
    pub approval_date: Option<DateTime<Utc>>,
    pub approved_by: Option<i32>,
    pub rejection_reason: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = institutions)]
pub struct NewInstitution {
    pub owner_id: i32,
    pub institution_email: Option<String>,
    pub institution_name: String,
    pub first_phone_number: Option<String>,
    pub second_phone_number: Option<String>,
    pub institution_logo: Option<String>,
    pub theme_color: Option<String>,
    pub setup: bool,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub approval_status: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct InstitutionView {
    #[serde(flatten)]
    pub institution: Institution,
    pub approval_status_display: &'static str,
}

impl From<Institution> for InstitutionView {
    fn from(institution: Institution) -> Self {
        let approval_status_display = ApprovalStatus::display(&institution.approval_status);
        Self {
            institution,
            approval_status_display,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInstitutionRequest {
    pub institution_name: String,
    pub institution_email: Option<String>,
    pub first_phone_number: Option<String>,
    pub second_phone_number: Option<String>,
    pub institution_logo: Option<String>,
    pub theme_color: Option<String>,
    pub setup: Option<bool>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInstitutionRequest {
    pub institution_name: Option<String>,
    pub institution_email: Option<String>,
    pub first_phone_number: Option<String>,
    pub second_phone_number: Option<String>,
    pub institution_logo: Option<String>,
    pub theme_color: Option<String>,
    pub setup: Option<bool>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub approval_status: Option<ApprovalStatus>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = institutions)]
pub struct InstitutionChanges {
    pub institution_name: Option<String>,
    pub institution_email: Option<String>,
    pub first_phone_number: Option<String>,
    pub second_phone_number: Option<String>,
    pub institution_logo: Option<String>,
    pub theme_color: Option<String>,
    pub setup: Option<bool>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub approval_status: Option<String>,
    pub approval_date: Option<DateTime<Utc>>,
    pub approved_by: Option<i32>,
    pub rejection_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ===== Branches =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = branches, check_for_backend(diesel::pg::Pg))]
pub struct Branch {
    pub id: i32,
    #[serde(rename = "institution")]
    pub institution_id: i32,
    pub branch_name: Option<String>,
    pub branch_phone_number: Option<String>,
    pub branch_location: String,
    pub branch_latitude: Option<f64>,
    pub branch_longitude: Option<f64>,
    pub branch_email: Option<String>,
    pub branch_opening_time: NaiveTime,
    pub branch_closing_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = branches)]
pub struct NewBranch {
    pub institution_id: i32,
    pub branch_name: Option<String>,
    pub branch_phone_number: Option<String>,
    pub branch_location: String,
    pub branch_latitude: Option<f64>,
    pub branch_longitude: Option<f64>,
    pub branch_email: Option<String>,
    pub branch_opening_time: NaiveTime,
    pub branch_closing_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub institution: i32,
    pub branch_name: Option<String>,
    pub branch_phone_number: Option<String>,
    pub branch_location: String,
    pub branch_latitude: Option<f64>,
    pub branch_longitude: Option<f64>,
    pub branch_email: Option<String>,
    pub branch_opening_time: Option<String>,
    pub branch_closing_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBranchRequest {
    pub branch_name: Option<String>,
    pub branch_phone_number: Option<String>,
    pub branch_location: Option<String>,
    pub branch_latitude: Option<f64>,
    pub branch_longitude: Option<f64>,
    pub branch_email: Option<String>,
    pub branch_opening_time: Option<String>,
    pub branch_closing_time: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = branches)]
pub struct BranchChanges {
    pub branch_name: Option<String>,
    pub branch_phone_number: Option<String>,
    pub branch_location: Option<String>,
    pub branch_latitude: Option<f64>,
    pub branch_longitude: Option<f64>,
    pub branch_email: Option<String>,
    pub branch_opening_time: Option<NaiveTime>,
    pub branch_closing_time: Option<NaiveTime>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = user_branches, check_for_backend(diesel::pg::Pg))]
pub struct UserBranch {
    pub id: i32,
    #[serde(rename = "user")]
    pub user_id: i32,
    #[serde(rename = "branch")]
    pub branch_id: i32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_branches)]
pub struct NewUserBranch {
    pub user_id: i32,
    pub branch_id: i32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserBranchRequest {
    pub user: i32,
    pub branch: i32,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBranchRequest {
    pub is_default: Option<bool>,
}

// ===== Client companies =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = client_companies, primary_key(uuid), check_for_backend(diesel::pg::Pg))]
pub struct ClientCompany {
    pub uuid: Uuid,
    #[serde(rename = "institution")]
    pub institution_id: i32,
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: String,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub has_system: bool,
    pub callback_url: Option<String>,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientCompanyRequest {
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: Option<CompanyStatus>,
    #[serde(default)]
    pub has_system: bool,
    pub callback_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateClientCompanyRequest {
    pub company_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: Option<CompanyStatus>,
    pub has_system: Option<bool>,
    pub callback_url: Option<String>,
    #[serde(default)]
    pub regenerate_api_key: bool,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = client_companies)]
pub struct ClientCompanyChanges {
    pub company_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: Option<String>,
    pub has_system: Option<bool>,
    pub callback_url: Option<String>,
    pub api_key: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ===== Products =====

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = products, primary_key(uuid), check_for_backend(diesel::pg::Pg))]
pub struct Product {
    pub uuid: Uuid,
    #[serde(rename = "institution")]
    pub institution_id: i32,
    pub name: String,
    pub descriptions: Option<String>,
    pub status: String,
    pub feedback_fields: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub descriptions: Option<String>,
    pub status: Option<ProductStatus>,
    pub feedback_fields: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub descriptions: Option<String>,
    pub status: Option<ProductStatus>,
    pub feedback_fields: Option<serde_json::Value>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub descriptions: Option<String>,
    pub status: Option<String>,
    pub feedback_fields: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = client_company_products, primary_key(uuid), check_for_backend(diesel::pg::Pg))]
pub struct ClientCompanyProduct {
    pub uuid: Uuid,
    #[serde(rename = "client_company")]
    pub client_company_uuid: Uuid,
    #[serde(rename = "product")]
    pub product_uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientCompanyProductRequest {
    pub client_company: Uuid,
    pub product: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ClientCompanyProductView {
    #[serde(flatten)]
    pub link: ClientCompanyProduct,
    pub company_name: String,
    pub product_name: String,
}

// ===== Profiles =====

#[derive(Debug, Deserialize)]
pub struct ProfileUserRequest {
    pub email: String,
    pub fullname: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub user: ProfileUserRequest,
    pub institution: i32,
    pub phone_number: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub phone_number: Option<String>,
    pub bio: Option<String>,
    pub fullname: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = crate::core::shared::schema::profiles)]
pub struct ProfileChanges {
    pub phone_number: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedProfileView {
    #[serde(flatten)]
    pub profile: crate::users::ProfileView,
    pub temporary_password: String,
}
