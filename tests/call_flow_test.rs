mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use callserver::call::contacts::{load_contact, save_contact_changes};
use callserver::call::types::ContactChanges;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

fn feedback_schema() -> serde_json::Value {
    json!([
        { "name": "outcome", "type": "select", "is_required": true, "options": ["sold", "declined"] },
        { "name": "notes", "type": "textarea", "max_length": 200 },
        { "name": "id_card", "type": "file", "allowed_extensions": ["pdf"], "max_file_size": "1MB" }
    ])
}

#[tokio::test]
async fn test_contact_group_and_call_lifecycle() {
    let Some(app) = common::spawn() else {
        return;
    };
    let (owner, _) = app.login_new_user("owner").await;
    let institution = app.create_institution(&owner).await;
    let product = app.create_product(&owner, institution, feedback_schema()).await;

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/call/contacts/institution/{}", institution),
            Some(&owner),
            Some(json!({ "name": "", "product": "not-a-uuid" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["name"][0], "Name is required");
    assert_eq!(body["phone_number"][0], "Phone number is required");
    assert_eq!(body["product"][0], "Invalid product UUID");

    let (status, contact) = app
        .request(
            Method::POST,
            &format!("/api/call/contacts/institution/{}", institution),
            Some(&owner),
            Some(json!({ "name": "Ama Mensah", "phone_number": "+233201234567", "product": product })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", contact);
    assert_eq!(contact["status"], "new");
    let contact_uuid = contact["uuid"].as_str().unwrap().to_string();
    let contact_product = contact["products"][0]["contact_product"]
        .as_str()
        .unwrap()
        .to_string();

    // Grouping a new contact assigns it.
    let (status, group) = app
        .request(
            Method::POST,
            &format!("/api/call/groups/{}", institution),
            Some(&owner),
            Some(json!({ "name": "Morning shift" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_uuid = group["uuid"].as_str().unwrap().to_string();
    let group_contacts = format!("/api/call/groups/contacts/{}", group_uuid);

    let (status, added) = app
        .request(
            Method::POST,
            &group_contacts,
            Some(&owner),
            Some(json!({ "contact_products": [contact_product, contact_product] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", added);
    assert_eq!(added["added_count"], 1);

    let (_, again) = app
        .request(
            Method::POST,
            &group_contacts,
            Some(&owner),
            Some(json!({ "contact_products": [contact_product] })),
        )
        .await;
    assert_eq!(again["added_count"], 0);
    assert_eq!(again["skipped_count"], 1);

    let contact_uri = format!("/api/call/contacts/detail/{}", contact_uuid);
    let (_, contact) = app.request(Method::GET, &contact_uri, Some(&owner), None).await;
    assert_eq!(contact["status"], "assigned");
    assert_eq!(contact["call_groups"][0]["uuid"], group_uuid.as_str());

    // Feedback is checked against the product's schema.
    let calls_uri = format!("/api/call/institution/{}", institution);
    let (status, body) = app
        .request(
            Method::POST,
            &calls_uri,
            Some(&owner),
            Some(json!({ "contact": contact_product, "feedback": { "notes": "call back" } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["feedback"][0], "Required field 'outcome' is missing");

    let (status, body) = app
        .request(
            Method::POST,
            &calls_uri,
            Some(&owner),
            Some(json!({ "contact": contact_product, "feedback": { "outcome": "sold", "mood": "happy" } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["feedback"][0], "Unknown field 'mood'");

    let (status, body) = app
        .multipart(
            Method::POST,
            &calls_uri,
            &owner,
            &[
                ("contact", None, contact_product.as_bytes()),
                ("feedback", None, br#"{"outcome": "sold"}"#),
                ("id_card", Some("card.exe"), b"MZ"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["feedback"][0]
        .as_str()
        .unwrap()
        .starts_with("File type '.exe' is not allowed"));

    let (status, call) = app
        .multipart(
            Method::POST,
            &calls_uri,
            &owner,
            &[
                ("contact", None, contact_product.as_bytes()),
                ("feedback", None, br#"{"outcome": "sold", "notes": "paid deposit"}"#),
                ("id_card", Some("card.pdf"), b"%PDF-1.4"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", call);
    assert_eq!(call["status"], "completed");
    assert_eq!(call["contact_name"], "Ama Mensah");
    let stored = &call["feedback"]["id_card"];
    assert_eq!(stored["file_name"], "card.pdf");
    let file_path = stored["file_path"].as_str().unwrap();
    assert!(app.media.path().join(file_path).exists());

    // A completed call marks the contact and its group entries attended.
    let (_, contact) = app.request(Method::GET, &contact_uri, Some(&owner), None).await;
    assert_eq!(contact["status"], "attended_to");
    assert_eq!(contact["call_count"], 1);
    let (_, entries) = app.request(Method::GET, &group_contacts, Some(&owner), None).await;
    assert_eq!(entries[0]["status"], "attended_to");

    let (status, calls) = app
        .request(
            Method::GET,
            &format!("/api/call/contact-calls/{}", contact_uuid),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(calls.as_array().unwrap().len(), 1);

    // Deleting the call removes its stored file.
    let call_uri = format!("/api/call/detail/{}", call["uuid"].as_str().unwrap());
    let (status, _) = app.request(Method::DELETE, &call_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!app.media.path().join(file_path).exists());
}

#[tokio::test]
async fn test_status_machine_and_export() {
    let Some(app) = common::spawn() else {
        return;
    };
    let (owner, _) = app.login_new_user("owner").await;
    let institution = app.create_institution(&owner).await;
    let product = app.create_product(&owner, institution, json!([])).await;

    let (_, contact) = app
        .request(
            Method::POST,
            &format!("/api/call/contacts/institution/{}", institution),
            Some(&owner),
            Some(json!({
                "name": "Kofi Boateng",
                "phone_number": "+233501234567",
                "status": "flagged",
                "product": product
            })),
        )
        .await;
    let contact_uuid = Uuid::parse_str(contact["uuid"].as_str().unwrap()).unwrap();
    let contact_uri = format!("/api/call/contacts/detail/{}", contact_uuid);
    let stale = {
        let mut conn = app.pool.get().unwrap();
        load_contact(&mut conn, contact_uuid).unwrap()
    };

    let (status, body) = app
        .request(
            Method::PATCH,
            &contact_uri,
            Some(&owner),
            Some(json!({ "status": "exported" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["status"][0],
        "Invalid status transition from 'flagged' to 'exported'."
    );

    let (status, body) = app
        .request(
            Method::PATCH,
            &contact_uri,
            Some(&owner),
            Some(json!({ "status": "ready_to_export", "remarks": "verified" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "ready_to_export");

    // A write based on a status read before the PATCH is refused.
    let changes = ContactChanges {
        name: None,
        phone_number: None,
        country: None,
        country_code: None,
        status: Some("ready_to_export".into()),
        remarks: None,
        updated_at: Utc::now(),
    };
    let mut conn = app.pool.get().unwrap();
    let err = save_contact_changes(&mut conn, &stale, &changes).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
    drop(conn);

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!(
            "/api/call/contacts/institution/{}/export?format=csv",
            institution
        ))
        .header(header::AUTHORIZATION, format!("Bearer {}", owner))
        .body(Body::empty())
        .unwrap();
    let (status, bytes) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(bytes).unwrap();
    assert!(csv.starts_with("uuid,name,phone_number"));
    assert!(csv.contains("Kofi Boateng"));

    let (_, contact) = app.request(Method::GET, &contact_uri, Some(&owner), None).await;
    assert_eq!(contact["status"], "exported");

    let (status, body) = app
        .request(
            Method::PATCH,
            &contact_uri,
            Some(&owner),
            Some(json!({ "status": "flagged" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
}

#[tokio::test]
async fn test_bulk_upload_and_template() {
    let Some(app) = common::spawn() else {
        return;
    };
    let (owner, _) = app.login_new_user("owner").await;
    let institution = app.create_institution(&owner).await;
    let product = app.create_product(&owner, institution, json!([])).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/call/contacts/{}/template", product))
        .header(header::AUTHORIZATION, format!("Bearer {}", owner))
        .body(Body::empty())
        .unwrap();
    let response_status = app.send(request).await.0;
    assert_eq!(response_status, StatusCode::OK);

    let upload_uri = format!("/api/call/contacts/{}/bulk-upload", product);
    let (outsider, _) = app.login_new_user("outsider").await;
    let (status, _) = app
        .multipart(
            Method::POST,
            &upload_uri,
            &outsider,
            &[("file", Some("contacts.csv"), b"name,country\nAma,Ghana\n")],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .multipart(
            Method::POST,
            &upload_uri,
            &owner,
            &[("file", Some("contacts.txt"), b"name")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "Invalid file type. Please upload an Excel file (.xlsx or .xls) or a CSV file (.csv)."
    );

    let csv = "name,phone_number,product_name,status\n\
               Ama,+233201234567,,flagged\n\
               ,+233201234568,,\n\
               Esi,+233201234569,Unknown,\n";
    let (status, body) = app
        .multipart(
            Method::POST,
            &upload_uri,
            &owner,
            &[("file", Some("contacts.csv"), csv.as_bytes())],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["created_count"], 1);
    assert_eq!(body["error_count"], 2);
    assert_eq!(body["errors"][0], "Row 3: Name is required");
    assert!(body["errors"][1]
        .as_str()
        .unwrap()
        .starts_with("Row 4: Product \"Unknown\" not found."));

    let (_, contacts) = app
        .request(
            Method::GET,
            &format!("/api/call/contacts/institution/{}?status=flagged", institution),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(contacts.as_array().unwrap().len(), 1);
    assert_eq!(contacts[0]["products"][0]["product"], product.as_str());

    let (status, body) = app
        .multipart(
            Method::POST,
            &upload_uri,
            &owner,
            &[("file", Some("contacts.csv"), b"name,country\nAma,Ghana\n")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Missing required columns: phone_number");
}

#[tokio::test]
async fn test_agents_and_group_membership() {
    let Some(app) = common::spawn() else {
        return;
    };
    let (owner, _) = app.login_new_user("owner").await;
    let institution = app.create_institution(&owner).await;

    let (_, profile) = app
        .request(
            Method::POST,
            "/api/institution/profile",
            Some(&owner),
            Some(json!({
                "user": {
                    "email": format!("agent-{}@example.com", Uuid::new_v4().simple()),
                    "fullname": "Yaw Agent"
                },
                "institution": institution
            })),
        )
        .await;
    let profile_id = profile["id"].as_i64().unwrap();

    let agents_uri = format!("/api/call/institutions/{}/agents", institution);
    let (status, body) = app
        .request(
            Method::POST,
            &agents_uri,
            Some(&owner),
            Some(json!({ "profile": i32::MAX })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["profile"][0], "Profile not found.");

    let (status, agent) = app
        .request(
            Method::POST,
            &agents_uri,
            Some(&owner),
            Some(json!({ "profile": profile_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", agent);
    assert_eq!(agent["fullname"], "Yaw Agent");
    let agent_uuid = agent["uuid"].as_str().unwrap().to_string();

    let (_, group) = app
        .request(
            Method::POST,
            &format!("/api/call/groups/{}", institution),
            Some(&owner),
            Some(json!({ "name": "Evening shift" })),
        )
        .await;
    let (status, link) = app
        .request(
            Method::POST,
            &format!("/api/call/group-users/{}", institution),
            Some(&owner),
            Some(json!({ "call_group": group["uuid"], "agent": agent_uuid })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", link);
    assert_eq!(link["status"], "active");

    let (status, groups) = app
        .request(
            Method::GET,
            &format!("/api/call/agent-groups/{}", agent_uuid),
            Some(&owner),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(groups[0]["name"], "Evening shift");
}

#[tokio::test]
async fn test_call_update_replaces_and_keeps_files() {
    let Some(app) = common::spawn() else {
        return;
    };
    let (owner, _) = app.login_new_user("owner").await;
    let institution = app.create_institution(&owner).await;
    let product = app.create_product(&owner, institution, feedback_schema()).await;

    let (_, contact) = app
        .request(
            Method::POST,
            &format!("/api/call/contacts/institution/{}", institution),
            Some(&owner),
            Some(json!({ "name": "Efua Asante", "phone_number": "+233241234567", "product": product })),
        )
        .await;
    let contact_product = contact["products"][0]["contact_product"]
        .as_str()
        .unwrap()
        .to_string();
    let calls_uri = format!("/api/call/institution/{}", institution);

    // File fields only accept server-stored entries.
    let forged = json!({ "file_url": "/media/x.pdf", "file_path": "uploads/calls/other/id_card/x.pdf" });
    let (status, body) = app
        .request(
            Method::POST,
            &calls_uri,
            Some(&owner),
            Some(json!({
                "contact": contact_product,
                "feedback": { "outcome": "sold", "id_card": forged }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["feedback"][0], "Field 'id_card' must be an uploaded file");

    let (status, body) = app
        .multipart(
            Method::POST,
            &calls_uri,
            &owner,
            &[
                ("contact", None, contact_product.as_bytes()),
                ("feedback", None, br#"{"outcome": "sold"}"#),
                ("id_card", Some("a.pdf"), b"%PDF-1.4 a"),
                ("id_card", Some("b.pdf"), b"%PDF-1.4 b"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["feedback"][0], "Field 'id_card' received more than one file");

    let (status, call) = app
        .multipart(
            Method::POST,
            &calls_uri,
            &owner,
            &[
                ("contact", None, contact_product.as_bytes()),
                ("feedback", None, br#"{"outcome": "sold"}"#),
                ("id_card", Some("old.pdf"), b"%PDF-1.4 old"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", call);
    let old_path = call["feedback"]["id_card"]["file_path"]
        .as_str()
        .unwrap()
        .to_string();
    let call_uri = format!("/api/call/detail/{}", call["uuid"].as_str().unwrap());

    let (status, updated) = app
        .multipart(
            Method::PATCH,
            &call_uri,
            &owner,
            &[("id_card", Some("new.pdf"), b"%PDF-1.4 new")],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    let replaced = updated["feedback"]["id_card"].clone();
    assert_eq!(replaced["file_name"], "new.pdf");
    assert_eq!(updated["feedback"]["outcome"], "sold");
    let new_path = replaced["file_path"].as_str().unwrap();
    assert_ne!(new_path, old_path);
    assert!(!app.media.path().join(&old_path).exists());
    assert!(app.media.path().join(new_path).exists());

    // Feedback is re-validated on update.
    let (status, body) = app
        .request(
            Method::PATCH,
            &call_uri,
            Some(&owner),
            Some(json!({ "feedback": { "outcome": "maybe" } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["feedback"][0], "Field 'outcome' must be one of: sold, declined");

    let (status, body) = app
        .request(
            Method::PATCH,
            &call_uri,
            Some(&owner),
            Some(json!({ "feedback": { "outcome": "sold", "id_card": forged } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["feedback"][0], "Field 'id_card' must be an uploaded file");

    let (status, updated) = app
        .request(
            Method::PATCH,
            &call_uri,
            Some(&owner),
            Some(json!({ "feedback": { "outcome": "declined" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["feedback"]["outcome"], "declined");
    assert_eq!(updated["feedback"]["id_card"], replaced);
    assert!(app.media.path().join(new_path).exists());

    // Malformed path parameters get a JSON error body.
    let (status, body) = app
        .request(Method::GET, "/api/call/detail/not-a-uuid", Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}
