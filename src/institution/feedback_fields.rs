//! Per-product feedback form definitions.
//!
//! A product stores its form as a JSON list such as
//!
//! ```json
//! [
//!   {"name": "outcome", "type": "select", "is_required": true, "options": ["sold", "declined"]},
//!   {"name": "age", "type": "number", "min_value": 18, "max_value": 120},
//!   {"name": "id_card", "type": "file", "allowed_extensions": ["pdf", "jpg"], "max_file_size": "5MB"}
//! ]
//! ```
//!
//! [`FeedbackSchema::parse`] is the strict check applied when a product is
//! written. [`FeedbackSchema::from_stored`] reads whatever is already stored.

use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FIELD_TYPES: [&str; 8] = [
    "text", "textarea", "select", "radio", "checkbox", "number", "email", "file",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Number,
    Email,
    File,
}

impl FieldType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "textarea" => Some(Self::Textarea),
            "select" => Some(Self::Select),
            "radio" => Some(Self::Radio),
            "checkbox" => Some(Self::Checkbox),
            "number" => Some(Self::Number),
            "email" => Some(Self::Email),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Number => "number",
            Self::Email => "email",
            Self::File => "file",
        }
    }

    pub fn needs_options(&self) -> bool {
        matches!(self, Self::Select | Self::Radio | Self::Checkbox)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_extensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<String>,
}

impl FeedbackField {
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }

    /// Maximum upload size in bytes, if configured.
    pub fn max_file_bytes(&self) -> Option<u64> {
        self.max_file_size.as_deref().and_then(parse_file_size)
    }

    /// Whether `extension` (with or without the leading dot) is accepted.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        match &self.allowed_extensions {
            None => true,
            Some(allowed) if allowed.is_empty() => true,
            Some(allowed) => {
                let ext = extension.trim_start_matches('.').to_lowercase();
                allowed
                    .iter()
                    .any(|a| a.trim_start_matches('.').to_lowercase() == ext)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackSchema {
    fields: Vec<FeedbackField>,
}

impl FeedbackSchema {
    pub fn parse(value: &Value) -> Result<Self, String> {
        let items = value
            .as_array()
            .ok_or_else(|| "Feedback fields must be a list.".to_string())?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(items.len());

        for item in items {
            let obj = item
                .as_object()
                .ok_or_else(|| "Each feedback field must be a dictionary.".to_string())?;

            let (name, type_name) = match (
                obj.get("name").and_then(Value::as_str),
                obj.get("type").and_then(Value::as_str),
            ) {
                (Some(n), Some(t)) if !n.trim().is_empty() => (n, t),
                _ => return Err("Each feedback field must have 'name' and 'type'.".to_string()),
            };

            let field_type = FieldType::parse(type_name).ok_or_else(|| {
                format!(
                    "Invalid field type: {}. Must be one of {:?}",
                    type_name, FIELD_TYPES
                )
            })?;

            if let Some(required) = obj.get("is_required") {
                if !required.is_boolean() {
                    return Err("'is_required' must be a boolean value.".to_string());
                }
            }

            if field_type.needs_options() {
                let has_options = obj
                    .get("options")
                    .and_then(Value::as_array)
                    .map(|opts| !opts.is_empty())
                    .unwrap_or(false);
                if !has_options {
                    return Err(format!(
                        "{} fields must have 'options'.",
                        capitalize(field_type.as_str())
                    ));
                }
            }

            if !seen.insert(name.to_string()) {
                return Err(format!("Duplicate field name '{}'.", name));
            }

            let field: FeedbackField = serde_json::from_value(item.clone())
                .map_err(|e| format!("Invalid configuration for field '{}': {}", name, e))?;

            check_bounds(&field)?;
            fields.push(field);
        }

        Ok(Self { fields })
    }

    pub fn from_stored(value: &Value) -> Self {
        let fields = value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match serde_json::from_value(item.clone()) {
                        Ok(field) => Some(field),
                        Err(e) => {
                            warn!("Skipping unreadable feedback field {}: {}", item, e);
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { fields }
    }

    pub fn fields(&self) -> &[FeedbackField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FeedbackField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn check_bounds(field: &FeedbackField) -> Result<(), String> {
    if let (Some(min), Some(max)) = (field.min_value, field.max_value) {
        if min > max {
            return Err(format!(
                "Field '{}' has min_value greater than max_value.",
                field.name
            ));
        }
    }
    if let (Some(min), Some(max)) = (field.min_length, field.max_length) {
        if min > max {
            return Err(format!(
                "Field '{}' has min_length greater than max_length.",
                field.name
            ));
        }
    }
    if let Some(size) = &field.max_file_size {
        if parse_file_size(size).is_none() {
            return Err(format!(
                "Invalid max_file_size '{}' for field '{}'. Use a value like '10MB'.",
                size, field.name
            ));
        }
    }
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parses sizes like `512KB`, `10MB` or `1GB` into bytes.
pub fn parse_file_size(size: &str) -> Option<u64> {
    let upper = size.trim().to_uppercase();
    let (digits, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else {
        return None;
    };
    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_schema() {
        let schema = FeedbackSchema::parse(&json!([
            {"name": "outcome", "type": "select", "is_required": true, "options": ["sold", "declined"]},
            {"name": "age", "type": "number", "min_value": 18, "max_value": 120},
            {"name": "notes", "type": "textarea", "max_length": 500},
            {"name": "id_card", "type": "file", "allowed_extensions": ["pdf"], "max_file_size": "5MB"}
        ]))
        .unwrap();

        assert_eq!(schema.fields().len(), 4);
        let outcome = schema.field("outcome").unwrap();
        assert!(outcome.is_required);
        assert_eq!(outcome.options(), ["sold", "declined"]);
        assert_eq!(schema.field("age").unwrap().min_value, Some(18.0));
        assert_eq!(
            schema.field("id_card").unwrap().max_file_bytes(),
            Some(5 * 1024 * 1024)
        );
    }

    #[test]
    fn test_schema_error_messages() {
        let cases = [
            (json!({"name": "x"}), "Feedback fields must be a list."),
            (json!(["x"]), "Each feedback field must be a dictionary."),
            (
                json!([{"name": "x"}]),
                "Each feedback field must have 'name' and 'type'.",
            ),
            (
                json!([{"name": "x", "type": "date"}]),
                "Invalid field type: date. Must be one of [\"text\", \"textarea\", \"select\", \"radio\", \"checkbox\", \"number\", \"email\", \"file\"]",
            ),
            (
                json!([{"name": "x", "type": "text", "is_required": "yes"}]),
                "'is_required' must be a boolean value.",
            ),
            (
                json!([{"name": "x", "type": "select"}]),
                "Select fields must have 'options'.",
            ),
            (
                json!([{"name": "x", "type": "checkbox", "options": []}]),
                "Checkbox fields must have 'options'.",
            ),
            (
                json!([{"name": "x", "type": "text"}, {"name": "x", "type": "email"}]),
                "Duplicate field name 'x'.",
            ),
            (
                json!([{"name": "x", "type": "number", "min_value": 5, "max_value": 1}]),
                "Field 'x' has min_value greater than max_value.",
            ),
        ];

        for (value, expected) in cases {
            assert_eq!(FeedbackSchema::parse(&value).unwrap_err(), expected);
        }
    }

    #[test]
    fn test_invalid_file_size_rejected() {
        let err = FeedbackSchema::parse(&json!([
            {"name": "doc", "type": "file", "max_file_size": "10 megabytes"}
        ]))
        .unwrap_err();
        assert!(err.starts_with("Invalid max_file_size"));
    }

    #[test]
    fn test_from_stored_skips_bad_entries() {
        let schema = FeedbackSchema::from_stored(&json!([
            {"name": "ok", "type": "text"},
            {"name": "bad", "type": "hologram"},
            "junk"
        ]));
        assert_eq!(schema.fields().len(), 1);
        assert!(FeedbackSchema::from_stored(&Value::Null).is_empty());
    }

    #[test]
    fn test_parse_file_size() {
        assert_eq!(parse_file_size("10MB"), Some(10 * 1024 * 1024));
        assert_eq!(parse_file_size("512kb"), Some(512 * 1024));
        assert_eq!(parse_file_size(" 2GB "), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_file_size("10"), None);
        assert_eq!(parse_file_size("1.5MB"), None);
        assert_eq!(parse_file_size("MB"), None);
    }

    #[test]
    fn test_accepts_extension() {
        let field: FeedbackField = serde_json::from_value(json!({
            "name": "doc", "type": "file", "allowed_extensions": [".PDF", "jpg"]
        }))
        .unwrap();
        assert!(field.accepts_extension(".pdf"));
        assert!(field.accepts_extension("JPG"));
        assert!(!field.accepts_extension("exe"));

        let open: FeedbackField =
            serde_json::from_value(json!({"name": "doc", "type": "file"})).unwrap();
        assert!(open.accepts_extension("anything"));
    }
}
