//! Validation of call feedback against a product's feedback form.
//!
//! Checks run in a fixed order and stop at the first failure: required
//! fields, unknown keys, then per-type value checks. Uploaded files are
//! checked separately by [`validate_upload`] before anything is stored.

use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Value};

use crate::core::shared::error::ApiError;
use crate::institution::{FeedbackField, FeedbackSchema, FieldType};
use crate::security::validation::is_valid_email;

/// Wraps a feedback message in the `{"feedback": [msg]}` error body.
pub fn feedback_error(message: impl Into<String>) -> ApiError {
    ApiError::field("feedback", message)
}

/// A stored upload is recorded as an object carrying at least `file_url`.
pub fn is_stored_file(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.contains_key("file_url"))
}

/// File fields only carry entries the server stored itself. A submitted value
/// for a file field must be null or equal to the entry already on the call.
pub fn check_client_files(
    schema: &FeedbackSchema,
    submitted: &Map<String, Value>,
    existing: &Map<String, Value>,
) -> Result<(), String> {
    for (key, value) in submitted {
        let is_file = schema
            .field(key)
            .is_some_and(|f| f.field_type == FieldType::File);
        if is_file && !value.is_null() && existing.get(key) != Some(value) {
            return Err(format!("Field '{}' must be an uploaded file", key));
        }
    }
    Ok(())
}

pub fn validate_feedback(
    schema: &FeedbackSchema,
    feedback: &Map<String, Value>,
    uploaded: &HashSet<String>,
) -> Result<(), String> {
    for field in schema.fields().iter().filter(|f| f.is_required) {
        let present = feedback.get(&field.name).is_some_and(|v| !v.is_null())
            || (field.field_type == FieldType::File && uploaded.contains(&field.name));
        if !present {
            return Err(format!("Required field '{}' is missing", field.name));
        }
    }

    if let Some(key) = feedback.keys().find(|k| schema.field(k).is_none()) {
        return Err(format!("Unknown field '{}'", key));
    }

    for (key, value) in feedback {
        if value.is_null() {
            continue;
        }
        if let Some(field) = schema.field(key) {
            check_value(field, value)?;
        }
    }
    Ok(())
}

fn check_value(field: &FeedbackField, value: &Value) -> Result<(), String> {
    let name = &field.name;
    match field.field_type {
        FieldType::Number => {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("Field '{}' must be a valid number", name))?;

            if let Some(min) = field.min_value {
                if number < min {
                    return Err(format!("Field '{}' must be at least {}", name, min));
                }
            }
            if let Some(max) = field.max_value {
                if number > max {
                    return Err(format!("Field '{}' must be at most {}", name, max));
                }
            }
        }
        FieldType::Email => {
            if !value.as_str().is_some_and(is_valid_email) {
                return Err(format!("Field '{}' must be a valid email address", name));
            }
        }
        FieldType::Select | FieldType::Radio => {
            let options = field.options();
            if !value
                .as_str()
                .is_some_and(|v| options.iter().any(|o| o == v))
            {
                return Err(format!(
                    "Field '{}' must be one of: {}",
                    name,
                    options.join(", ")
                ));
            }
        }
        FieldType::Checkbox => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("Field '{}' must be a list", name))?;
            let options = field.options();
            for item in items {
                let valid = item
                    .as_str()
                    .is_some_and(|v| options.iter().any(|o| o == v));
                if !valid {
                    let shown = item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string());
                    return Err(format!(
                        "Field '{}' contains invalid option: {}",
                        name, shown
                    ));
                }
            }
        }
        FieldType::Text | FieldType::Textarea => {
            let text = value
                .as_str()
                .ok_or_else(|| format!("Field '{}' must be a string", name))?;
            let length = text.chars().count();
            if let Some(min) = field.min_length {
                if length < min {
                    return Err(format!(
                        "Field '{}' must be at least {} characters",
                        name, min
                    ));
                }
            }
            if let Some(max) = field.max_length {
                if length > max {
                    return Err(format!(
                        "Field '{}' must be at most {} characters",
                        name, max
                    ));
                }
            }
        }
        FieldType::File => {
            if !is_stored_file(value) {
                return Err(format!("Field '{}' must be an uploaded file", name));
            }
        }
    }
    Ok(())
}

/// Extension of `file_name` including the leading dot, lowercased.
pub fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

pub fn validate_upload(
    schema: &FeedbackSchema,
    field_name: &str,
    file_name: &str,
    size: u64,
) -> Result<(), String> {
    let field = schema
        .field(field_name)
        .ok_or_else(|| format!("Unknown field '{}'", field_name))?;
    if field.field_type != FieldType::File {
        return Err(format!("Field '{}' is not a file field", field_name));
    }

    let extension = file_extension(file_name);
    if !field.accepts_extension(&extension) {
        let allowed = field
            .allowed_extensions
            .as_deref()
            .unwrap_or_default()
            .join(", ");
        return Err(format!(
            "File type '{}' is not allowed for field '{}'. Allowed: {}",
            extension, field_name, allowed
        ));
    }

    if let (Some(limit), Some(label)) = (field.max_file_bytes(), field.max_file_size.as_deref()) {
        if size > limit {
            return Err(format!(
                "File size exceeds the maximum allowed size of {} for field '{}'",
                label, field_name
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> FeedbackSchema {
        FeedbackSchema::parse(&json!([
            {"name": "outcome", "type": "select", "is_required": true, "options": ["sold", "declined"]},
            {"name": "age", "type": "number", "min_value": 18, "max_value": 120},
            {"name": "email", "type": "email"},
            {"name": "interests", "type": "checkbox", "options": ["tv", "radio"]},
            {"name": "notes", "type": "textarea", "min_length": 3, "max_length": 10},
            {"name": "id_card", "type": "file", "is_required": true, "allowed_extensions": ["pdf", "jpg"], "max_file_size": "1MB"}
        ]))
        .unwrap()
    }

    fn feedback(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn uploaded() -> HashSet<String> {
        HashSet::from(["id_card".to_string()])
    }

    #[test]
    fn test_valid_feedback() {
        let fb = feedback(json!({
            "outcome": "sold",
            "age": "42",
            "email": "buyer@example.com",
            "interests": ["tv"],
            "notes": "call back"
        }));
        assert_eq!(validate_feedback(&schema(), &fb, &uploaded()), Ok(()));
    }

    #[test]
    fn test_required_fields() {
        let fb = feedback(json!({"age": 30}));
        assert_eq!(
            validate_feedback(&schema(), &fb, &uploaded()),
            Err("Required field 'outcome' is missing".to_string())
        );

        let fb = feedback(json!({"outcome": "sold"}));
        assert_eq!(
            validate_feedback(&schema(), &fb, &HashSet::new()),
            Err("Required field 'id_card' is missing".to_string())
        );

        let stored = feedback(json!({
            "outcome": "sold",
            "id_card": {"file_name": "id.pdf", "file_url": "/media/x/id.pdf"}
        }));
        assert_eq!(validate_feedback(&schema(), &stored, &HashSet::new()), Ok(()));
    }

    #[test]
    fn test_type_errors() {
        let cases = [
            (json!({"outcome": "maybe"}), "Field 'outcome' must be one of: sold, declined"),
            (json!({"outcome": "sold", "age": "old"}), "Field 'age' must be a valid number"),
            (json!({"outcome": "sold", "age": 12}), "Field 'age' must be at least 18"),
            (json!({"outcome": "sold", "age": 121.5}), "Field 'age' must be at most 120"),
            (json!({"outcome": "sold", "email": "nope"}), "Field 'email' must be a valid email address"),
            (json!({"outcome": "sold", "interests": "tv"}), "Field 'interests' must be a list"),
            (json!({"outcome": "sold", "interests": ["tv", "print"]}), "Field 'interests' contains invalid option: print"),
            (json!({"outcome": "sold", "notes": "hi"}), "Field 'notes' must be at least 3 characters"),
            (json!({"outcome": "sold", "notes": "far too long text"}), "Field 'notes' must be at most 10 characters"),
            (json!({"outcome": "sold", "id_card": "id.pdf"}), "Field 'id_card' must be an uploaded file"),
            (json!({"outcome": "sold", "mood": "happy"}), "Unknown field 'mood'"),
        ];
        for (value, expected) in cases {
            assert_eq!(
                validate_feedback(&schema(), &feedback(value), &uploaded()),
                Err(expected.to_string())
            );
        }
    }

    #[test]
    fn test_upload_checks() {
        let schema = schema();
        assert_eq!(validate_upload(&schema, "id_card", "scan.PDF", 1024), Ok(()));
        assert_eq!(
            validate_upload(&schema, "photo", "a.jpg", 10),
            Err("Unknown field 'photo'".to_string())
        );
        assert_eq!(
            validate_upload(&schema, "notes", "a.txt", 10),
            Err("Field 'notes' is not a file field".to_string())
        );
        assert_eq!(
            validate_upload(&schema, "id_card", "virus.exe", 10),
            Err("File type '.exe' is not allowed for field 'id_card'. Allowed: pdf, jpg".to_string())
        );
        assert_eq!(
            validate_upload(&schema, "id_card", "big.pdf", 2 * 1024 * 1024),
            Err("File size exceeds the maximum allowed size of 1MB for field 'id_card'".to_string())
        );
    }

    #[test]
    fn test_client_file_entries() {
        let forged = feedback(json!({
            "outcome": "sold",
            "id_card": {"file_url": "x", "file_path": "uploads/calls/other/id_card/1.pdf"}
        }));
        assert_eq!(
            check_client_files(&schema(), &forged, &Map::new()),
            Err("Field 'id_card' must be an uploaded file".to_string())
        );

        let existing = feedback(json!({
            "id_card": {"file_url": "/media/a.pdf", "file_path": "uploads/calls/a/id_card/1.pdf"}
        }));
        assert!(check_client_files(&schema(), &forged, &existing).is_err());

        let echoed = feedback(json!({"outcome": "sold", "id_card": existing["id_card"].clone()}));
        assert_eq!(check_client_files(&schema(), &echoed, &existing), Ok(()));
        let cleared = feedback(json!({"outcome": "sold", "id_card": null}));
        assert_eq!(check_client_files(&schema(), &cleared, &Map::new()), Ok(()));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.Final.PDF"), ".pdf");
        assert_eq!(file_extension("noext"), "");
    }
}
