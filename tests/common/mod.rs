#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use callserver::core::config::AppConfig;
use callserver::core::server::build_router;
use callserver::core::shared::state::AppState;
use callserver::core::shared::utils::{create_conn, run_migrations, DbPool};
use callserver::storage::LocalStorage;

static MIGRATIONS: OnceLock<Mutex<bool>> = OnceLock::new();

pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    pub media: TempDir,
}

/// Builds the application against `DATABASE_URL`, or `None` when no database is configured.
pub fn spawn() -> Option<TestApp> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            println!("Skipping test - database not available");
            return None;
        }
    };

    let media = TempDir::new().expect("temp media dir");
    let env: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", database_url.clone()),
        ("DB_POOL_SIZE", "4".to_string()),
        ("JWT_SECRET", "integration-test-secret".to_string()),
        ("MEDIA_ROOT", media.path().display().to_string()),
        ("MEDIA_URL", "/media/".to_string()),
        ("BASE_URL", "http://testserver".to_string()),
    ]);
    let config = AppConfig::from_lookup(|key| env.get(key).cloned()).expect("test config");

    let pool = match create_conn(&database_url, config.database.pool_size) {
        Ok(pool) => pool,
        Err(e) => {
            println!("Skipping test - database not available: {}", e);
            return None;
        }
    };
    {
        let mut migrated = MIGRATIONS
            .get_or_init(|| Mutex::new(false))
            .lock()
            .expect("migration lock");
        if !*migrated {
            run_migrations(&pool).expect("migrations");
            *migrated = true;
        }
    }

    let storage = Arc::new(LocalStorage::new(media.path(), &config.media.url));
    let state = Arc::new(AppState::new(pool.clone(), config, storage).expect("app state"));
    Some(TestApp {
        router: build_router(state),
        pool,
        media,
    })
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("response body")
            .to_bytes()
            .to_vec();
        (status, body)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        parts: &[(&str, Option<&str>, &[u8])],
    ) -> (StatusCode, Value) {
        let boundary = format!("----callserver{}", Uuid::new_v4().simple());
        let mut body = Vec::new();
        for (name, file_name, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .expect("multipart request");
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Registers a fresh user and returns `(token, user_id)`.
    pub async fn login_new_user(&self, name: &str) -> (String, i64) {
        let email = format!("{}-{}@example.com", name, Uuid::new_v4().simple());
        let (status, user) = self
            .request(
                Method::POST,
                "/api/user/register",
                None,
                Some(json!({ "email": email, "fullname": name, "password": "Secret123!" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", user);

        let (status, login) = self
            .request(
                Method::POST,
                "/api/user/login",
                None,
                Some(json!({ "email": email, "password": "Secret123!" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", login);
        (
            login["access_token"].as_str().expect("token").to_string(),
            user["id"].as_i64().expect("user id"),
        )
    }

    pub async fn create_institution(&self, token: &str) -> i64 {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/institution",
                Some(token),
                Some(json!({ "institution_name": format!("Institution {}", Uuid::new_v4().simple()) })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().expect("institution id")
    }

    pub async fn create_product(&self, token: &str, institution: i64, fields: Value) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                &format!("/api/institution/products/{}", institution),
                Some(token),
                Some(json!({ "name": format!("Loans {}", Uuid::new_v4().simple()), "feedback_fields": fields })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["uuid"].as_str().expect("product uuid").to_string()
    }
}
