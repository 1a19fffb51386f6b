use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use chrono::Utc;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::feedback::{feedback_error, file_extension};
use crate::core::shared::error::ApiError;
use crate::core::shared::state::AppState;
use crate::storage::FileStorage;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Body of a call create or update, sent either as JSON or as multipart.
#[derive(Debug, Default)]
pub struct CallPayload {
    pub contact: Option<String>,
    pub status: Option<String>,
    pub feedback: Option<Map<String, Value>>,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Deserialize)]
struct CallJson {
    contact: Option<String>,
    status: Option<String>,
    feedback: Option<Value>,
}

fn feedback_object(value: Value) -> Result<Option<Map<String, Value>>, ApiError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::String(text) => match serde_json::from_str(&text) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            _ => Err(feedback_error("Feedback must be a JSON object.")),
        },
        _ => Err(feedback_error("Feedback must be a JSON object.")),
    }
}

#[async_trait]
impl FromRequest<Arc<AppState>> for CallPayload {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(body) = Json::<CallJson>::from_request(req, state).await?;
            return Ok(Self {
                contact: body.contact,
                status: body.status,
                feedback: body.feedback.map(feedback_object).transpose()?.flatten(),
                files: Vec::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        let mut payload = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.body_text()))?;
                debug!("Received upload '{}' for field '{}'", file_name, name);
                payload.files.push(UploadedFile {
                    field: name,
                    file_name,
                    data: data.to_vec(),
                });
                continue;
            }

            let text = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(e.body_text()))?;
            match name.as_str() {
                "contact" => payload.contact = Some(text),
                "status" => payload.status = Some(text),
                "feedback" => payload.feedback = feedback_object(Value::String(text))?,
                other => debug!("Ignoring multipart field '{}'", other),
            }
        }

        Ok(payload)
    }
}

pub fn upload_path(call_uuid: Uuid, field: &str, file_name: &str) -> String {
    format!(
        "uploads/calls/{}/{}/{}{}",
        call_uuid,
        field,
        Uuid::new_v4(),
        file_extension(file_name)
    )
}

/// Stores every upload and returns the feedback entries keyed by field.
///
/// On failure the files already written for this batch are removed again.
pub async fn store_uploads(
    storage: &dyn FileStorage,
    call_uuid: Uuid,
    files: Vec<UploadedFile>,
) -> Result<Vec<(String, Value)>, ApiError> {
    let mut stored: Vec<(String, Value)> = Vec::with_capacity(files.len());

    for file in files {
        let path = upload_path(call_uuid, &file.field, &file.file_name);
        match storage.save(&path, file.data).await {
            Ok(url) => stored.push((
                file.field,
                json!({
                    "file_name": file.file_name,
                    "file_url": url,
                    "file_path": path,
                    "uploaded_at": Utc::now().to_rfc3339(),
                }),
            )),
            Err(e) => {
                let written: Vec<Value> = stored.into_iter().map(|(_, v)| v).collect();
                delete_files(storage, call_uuid, written.iter()).await;
                return Err(e);
            }
        }
    }
    Ok(stored)
}

/// Storage path of a file entry, when it lies under the call's upload prefix.
pub fn owned_path(call_uuid: Uuid, entry: &Value) -> Option<&str> {
    let prefix = format!("uploads/calls/{}/", call_uuid);
    entry
        .get("file_path")
        .and_then(Value::as_str)
        .filter(|path| path.starts_with(&prefix))
}

/// Removes the stored objects behind a call's file entries, logging failures.
/// Entries pointing outside the call's upload prefix are never deleted.
pub async fn delete_files<'a>(
    storage: &dyn FileStorage,
    call_uuid: Uuid,
    entries: impl Iterator<Item = &'a Value>,
) {
    for entry in entries {
        let Some(path) = owned_path(call_uuid, entry) else {
            if entry.get("file_path").is_some() {
                warn!("Skipping file entry outside call {}: {}", call_uuid, entry);
            }
            continue;
        };
        if let Err(e) = storage.delete(path).await {
            warn!("Failed to delete stored file {}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;

    #[test]
    fn test_upload_path_layout() {
        let call = Uuid::new_v4();
        let path = upload_path(call, "id_card", "Scan.PDF");
        let prefix = format!("uploads/calls/{}/id_card/", call);
        assert!(path.starts_with(&prefix));
        assert!(path.ends_with(".pdf"));
        let stem = &path[prefix.len()..path.len() - 4];
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn test_feedback_object_parsing() {
        assert_eq!(feedback_object(Value::Null).unwrap(), None);
        assert_eq!(feedback_object(json!("  ")).unwrap(), None);
        let map = feedback_object(json!("{\"outcome\": \"sold\"}")).unwrap().unwrap();
        assert_eq!(map.get("outcome"), Some(&json!("sold")));
        assert!(feedback_object(json!([1, 2])).is_err());
        assert!(feedback_object(json!("not json")).is_err());
    }

    #[tokio::test]
    async fn test_store_and_delete_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media/");
        let call = Uuid::new_v4();

        let stored = store_uploads(
            &storage,
            call,
            vec![UploadedFile {
                field: "id_card".into(),
                file_name: "id.pdf".into(),
                data: b"%PDF-1.4".to_vec(),
            }],
        )
        .await
        .unwrap();

        assert_eq!(stored.len(), 1);
        let (field, entry) = &stored[0];
        assert_eq!(field, "id_card");
        assert_eq!(entry["file_name"], "id.pdf");
        let path = entry["file_path"].as_str().unwrap();
        assert_eq!(entry["file_url"], format!("/media/{}", path));
        assert!(dir.path().join(path).exists());

        delete_files(&storage, call, stored.iter().map(|(_, v)| v)).await;
        assert!(!dir.path().join(path).exists());
    }

    #[tokio::test]
    async fn test_delete_skips_other_calls_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media/");
        let victim_call = Uuid::new_v4();
        let stored = store_uploads(
            &storage,
            victim_call,
            vec![UploadedFile {
                field: "id_card".into(),
                file_name: "id.pdf".into(),
                data: b"%PDF-1.4".to_vec(),
            }],
        )
        .await
        .unwrap();
        let victim = stored[0].1.clone();
        let path = victim["file_path"].as_str().unwrap();

        let other_call = Uuid::new_v4();
        assert_eq!(owned_path(other_call, &victim), None);
        assert_eq!(owned_path(victim_call, &victim), Some(path));

        delete_files(&storage, other_call, std::iter::once(&victim)).await;
        assert!(dir.path().join(path).exists());
    }
}
