diesel::table! {
    users (id) {
        id -> Int4,
        email -> Varchar,
        fullname -> Varchar,
        password_hash -> Varchar,
        is_active -> Bool,
        is_staff -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    institutions (id) {
        id -> Int4,
        owner_id -> Int4,
        institution_email -> Nullable<Varchar>,
        institution_name -> Varchar,
        first_phone_number -> Nullable<Varchar>,
        second_phone_number -> Nullable<Varchar>,
        institution_logo -> Nullable<Varchar>,
        theme_color -> Nullable<Varchar>,
        setup -> Bool,
        location -> Nullable<Varchar>,
        latitude -> Nullable<Float8>,
        longitude -> Nullable<Float8>,
        approval_status -> Varchar,
        approval_date -> Nullable<Timestamptz>,
        approved_by -> Nullable<Int4>,
        rejection_reason -> Nullable<Text>,
        description -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        created_by -> Nullable<Int4>,
    }
}

diesel::table! {
    profiles (id) {
        id -> Int4,
        user_id -> Int4,
        institution_id -> Nullable<Int4>,
        phone_number -> Nullable<Varchar>,
        bio -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    branches (id) {
        id -> Int4,
        institution_id -> Int4,
        branch_name -> Nullable<Varchar>,
        branch_phone_number -> Nullable<Varchar>,
        branch_location -> Varchar,
        branch_latitude -> Nullable<Float8>,
        branch_longitude -> Nullable<Float8>,
        branch_email -> Nullable<Varchar>,
        branch_opening_time -> Time,
        branch_closing_time -> Time,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        created_by -> Nullable<Int4>,
    }
}

diesel::table! {
    user_branches (id) {
        id -> Int4,
        user_id -> Int4,
        branch_id -> Int4,
        is_default -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        created_by -> Nullable<Int4>,
    }
}

diesel::table! {
    client_companies (uuid) {
        uuid -> Uuid,
        institution_id -> Int4,
        company_name -> Varchar,
        contact_email -> Nullable<Varchar>,
        contact_phone -> Nullable<Varchar>,
        status -> Varchar,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        has_system -> Bool,
        callback_url -> Nullable<Varchar>,
        api_key -> Varchar,
    }
}

diesel::table! {
    products (uuid) {
        uuid -> Uuid,
        institution_id -> Int4,
        name -> Varchar,
        descriptions -> Nullable<Text>,
        status -> Varchar,
        feedback_fields -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    client_company_products (uuid) {
        uuid -> Uuid,
        client_company_uuid -> Uuid,
        product_uuid -> Uuid,
        created_at -> Timestamptz,
        created_by -> Nullable<Int4>,
    }
}

diesel::table! {
    contacts (uuid) {
        uuid -> Uuid,
        institution_id -> Int4,
        name -> Varchar,
        phone_number -> Varchar,
        country -> Nullable<Varchar>,
        country_code -> Nullable<Varchar>,
        status -> Varchar,
        remarks -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    contact_products (uuid) {
        uuid -> Uuid,
        contact_uuid -> Uuid,
        product_uuid -> Uuid,
        created_by -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    agents (uuid) {
        uuid -> Uuid,
        profile_id -> Int4,
        institution_id -> Int4,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    call_groups (uuid) {
        uuid -> Uuid,
        institution_id -> Int4,
        name -> Varchar,
        created_at -> Timestamptz,
        created_by -> Nullable<Int4>,
    }
}

diesel::table! {
    call_group_agents (uuid) {
        uuid -> Uuid,
        call_group_uuid -> Uuid,
        agent_uuid -> Uuid,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    call_group_contacts (uuid) {
        uuid -> Uuid,
        call_group_uuid -> Uuid,
        contact_product_uuid -> Uuid,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    calls (uuid) {
        uuid -> Uuid,
        contact_product_uuid -> Uuid,
        feedback -> Jsonb,
        status -> Varchar,
        made_by -> Nullable<Int4>,
        made_on -> Timestamptz,
    }
}

diesel::joinable!(profiles -> users (user_id));
diesel::joinable!(branches -> institutions (institution_id));
diesel::joinable!(user_branches -> branches (branch_id));
diesel::joinable!(client_companies -> institutions (institution_id));
diesel::joinable!(products -> institutions (institution_id));
diesel::joinable!(client_company_products -> client_companies (client_company_uuid));
diesel::joinable!(client_company_products -> products (product_uuid));
diesel::joinable!(contacts -> institutions (institution_id));
diesel::joinable!(contact_products -> contacts (contact_uuid));
diesel::joinable!(contact_products -> products (product_uuid));
diesel::joinable!(agents -> profiles (profile_id));
diesel::joinable!(call_groups -> institutions (institution_id));
diesel::joinable!(call_group_agents -> call_groups (call_group_uuid));
diesel::joinable!(call_group_agents -> agents (agent_uuid));
diesel::joinable!(call_group_contacts -> call_groups (call_group_uuid));
diesel::joinable!(call_group_contacts -> contact_products (contact_product_uuid));
diesel::joinable!(calls -> contact_products (contact_product_uuid));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    institutions,
    profiles,
    branches,
    user_branches,
    client_companies,
    products,
    client_company_products,
    contacts,
    contact_products,
    agents,
    call_groups,
    call_group_agents,
    call_group_contacts,
    calls,
);
