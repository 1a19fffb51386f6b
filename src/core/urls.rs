#[derive(Debug)]
pub struct ApiUrls;

impl ApiUrls {
    // Health
    pub const HEALTH: &'static str = "/health";
    pub const API_HEALTH: &'static str = "/api/health";

    // Users
    pub const USER_REGISTER: &'static str = "/api/user/register";
    pub const USER_LOGIN: &'static str = "/api/user/login";
    pub const USER_ME: &'static str = "/api/user/me";
    pub const USER_BY_ID: &'static str = "/api/user/:id";

    // Institutions
    pub const INSTITUTIONS: &'static str = "/api/institution";
    pub const INSTITUTION_BY_ID: &'static str = "/api/institution/:institution_id";
    pub const INSTITUTION_BRANCHES: &'static str = "/api/institution/:institution_id/branch";

    // Branches
    pub const BRANCHES: &'static str = "/api/institution/branch";
    pub const BRANCH_BY_ID: &'static str = "/api/institution/branch/:branch_id";
    pub const USER_BRANCHES: &'static str = "/api/institution/branch/user";
    pub const USER_BRANCH_BY_ID: &'static str = "/api/institution/branch/user/:user_branch_id";
    pub const USER_BRANCH_BY_IDS: &'static str = "/api/institution/branch/user/:user_id/:branch_id";

    // Profiles
    pub const PROFILES: &'static str = "/api/institution/profile";
    pub const INSTITUTION_PROFILES: &'static str = "/api/institution/profile/:institution_id";
    pub const PROFILE_BY_USER: &'static str = "/api/institution/profile/user/:user_id";

    // Client companies and products
    pub const CLIENT_COMPANIES: &'static str = "/api/institution/client-companies/:institution_id";
    pub const CLIENT_COMPANY_BY_ID: &'static str = "/api/institution/client-companies/detail/:uuid";
    pub const PRODUCTS: &'static str = "/api/institution/products/:institution_id";
    pub const PRODUCT_BY_ID: &'static str = "/api/institution/products/detail/:uuid";
    pub const CLIENT_COMPANY_PRODUCTS: &'static str =
        "/api/institution/client-company-products/:institution_id";
    pub const CLIENT_COMPANY_PRODUCT_BY_ID: &'static str =
        "/api/institution/client-company-products/detail/:uuid";

    // Call groups
    pub const CALL_GROUPS: &'static str = "/api/call/groups/:institution_id";
    pub const MY_CALL_GROUPS: &'static str = "/api/call/groups/my-groups/:institution_id";
    pub const CALL_GROUP_BY_ID: &'static str = "/api/call/groups/detail/:uuid";
    pub const CALL_GROUP_CONTACTS: &'static str = "/api/call/groups/contacts/:call_group_uuid";
    pub const CALL_GROUP_AGENTS: &'static str = "/api/call/group-users/:institution_id";
    pub const CALL_GROUP_AGENT_BY_ID: &'static str = "/api/call/group-users/detail/:uuid";
    pub const GROUP_CONTACTS: &'static str = "/api/call/group-contacts/:institution_id";
    pub const GROUP_CONTACT_BY_ID: &'static str = "/api/call/group-contacts/detail/:uuid";

    // Contacts
    pub const CONTACTS: &'static str = "/api/call/contacts/institution/:institution_id";
    pub const CONTACTS_EXPORT: &'static str =
        "/api/call/contacts/institution/:institution_id/export";
    pub const CONTACT_BY_ID: &'static str = "/api/call/contacts/detail/:uuid";
    pub const CONTACT_TEMPLATE: &'static str = "/api/call/contacts/:product_uuid/template";
    pub const CONTACT_BULK_UPLOAD: &'static str = "/api/call/contacts/:product_uuid/bulk-upload";
    pub const CONTACT_PRODUCTS: &'static str =
        "/api/call/institutions/:institution_id/contact-products";
    pub const CONTACT_PRODUCT_BY_ID: &'static str = "/api/call/contact-products/:uuid";

    // Agents
    pub const AGENTS: &'static str = "/api/call/institutions/:institution_id/agents";
    pub const AGENT_BY_ID: &'static str = "/api/call/agents/:uuid";

    // Calls
    pub const CALLS: &'static str = "/api/call/institution/:institution_id";
    pub const CALL_BY_ID: &'static str = "/api/call/detail/:uuid";
    pub const CONTACT_CALLS: &'static str = "/api/call/contact-calls/:contact_uuid";
    pub const AGENT_CALLS: &'static str = "/api/call/agent-calls/:agent_uuid";
    pub const AGENT_GROUPS: &'static str = "/api/call/agent-groups/:agent_uuid";
}
