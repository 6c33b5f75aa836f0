use crate::models::Story;

/// Suggested download name for an export.
pub(crate) const EXPORT_FILE_NAME: &str = "storypad-stories.json";

/// Pretty-printed JSON array of the full slot, secrets included. Exports
/// are a local backup, not a sync path.
pub(crate) fn export_json(stories: &[Story]) -> String {
    serde_json::to_string_pretty(stories).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ImportError {
    /// The file is not JSON at all.
    Unreadable(String),
    /// Valid JSON, wrong top-level shape.
    NotAnArray,
    /// One element failed to decode as a story. Index is zero-based.
    BadRecord { index: usize, message: String },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Unreadable(msg) => {
                write!(f, "Import file is not valid JSON: {msg}")
            }
            ImportError::NotAnArray => {
                write!(f, "Import file must contain a JSON array of stories.")
            }
            ImportError::BadRecord { index, message } => {
                write!(f, "Story {} is malformed: {message}", index + 1)
            }
        }
    }
}

/// Strict, all-or-nothing decode of an export file. One bad record
/// rejects the whole file; the existing slot is never half-replaced.
pub(crate) fn parse_import(raw: &str) -> Result<Vec<Story>, ImportError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ImportError::Unreadable(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => return Err(ImportError::NotAnArray),
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let story: Story = serde_json::from_value(item).map_err(|e| ImportError::BadRecord {
            index,
            message: e.to_string(),
        })?;
        out.push(story);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(id: &str) -> Story {
        Story {
            id: id.to_string(),
            title: "Title".to_string(),
            content: "Content".to_string(),
            tags: vec!["secret".to_string()],
            favorite: true,
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            remote_ref: Some("ref-1".to_string()),
        }
    }

    #[test]
    fn test_export_then_import_preserves_every_field() {
        let original = vec![story("a"), story("b")];
        let parsed = parse_import(&export_json(&original)).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_export_uses_contract_field_names() {
        let json = export_json(&[story("a")]);
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"remoteRef\""));
    }

    #[test]
    fn test_import_accepts_minimal_records() {
        let parsed = parse_import(
            r#"[{"id":"1","title":"t","content":"c","createdAt":"2024-01-01T00:00:00.000Z"}]"#,
        )
        .unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].tags.is_empty());
        assert!(!parsed[0].favorite);
        assert_eq!(parsed[0].remote_ref, None);
    }

    #[test]
    fn test_import_rejects_non_json() {
        let err = parse_import("not json").unwrap_err();
        assert!(matches!(err, ImportError::Unreadable(_)));
        assert!(err.to_string().starts_with("Import file is not valid JSON"));
    }

    #[test]
    fn test_import_rejects_a_non_array_top_level() {
        let err = parse_import(r#"{"stories":[]}"#).unwrap_err();
        assert_eq!(err, ImportError::NotAnArray);
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        // Second record is missing required fields; nothing imports.
        let err = parse_import(
            r#"[
                {"id":"1","title":"t","content":"c","createdAt":"2024-01-01T00:00:00.000Z"},
                {"id":"2"}
            ]"#,
        )
        .unwrap_err();
        match &err {
            ImportError::BadRecord { index, .. } => assert_eq!(*index, 1),
            other => panic!("expected BadRecord, got {other:?}"),
        }
        // User-facing message counts from one.
        assert!(err.to_string().starts_with("Story 2 is malformed"));
    }

    #[test]
    fn test_import_accepts_an_empty_array() {
        assert_eq!(parse_import("[]").unwrap(), Vec::<Story>::new());
    }
}
