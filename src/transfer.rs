//! JSON import/export of the full data set.
//!
//! Import is all-or-nothing: the document is validated before any store
//! mutation, and a failure rejects the whole file.

use crate::managers::meeting::Meeting;
use crate::managers::reminder::Reminder;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The on-disk interchange document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub meetings: Vec<Meeting>,
    pub reminders: Vec<Reminder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("`meetings` must be an array")]
    MeetingsNotArray,
    #[error("`reminders` must be an array")]
    RemindersNotArray,
    #[error("meeting {index} is missing a non-empty `{field}`")]
    InvalidMeeting { index: usize, field: &'static str },
}

/// Pretty-printed with 2-space indentation, the format existing exports use.
pub fn export_json(
    meetings: &[Meeting],
    reminders: &[Reminder],
    groups: &[String],
) -> Result<String> {
    let document = ExportDocument {
        meetings: meetings.to_vec(),
        reminders: reminders.to_vec(),
        groups: Some(groups.to_vec()),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Validate and parse an import file. Checks run against the raw JSON
/// before deserialization so the error names what the user's file got
/// wrong rather than where serde gave up.
pub fn parse_import(raw: &str) -> Result<ExportDocument, ImportError> {
    let value: Value = serde_json::from_str(raw)?;

    let meetings = value
        .get("meetings")
        .and_then(Value::as_array)
        .ok_or(ImportError::MeetingsNotArray)?;
    if value.get("reminders").and_then(Value::as_array).is_none() {
        return Err(ImportError::RemindersNotArray);
    }

    for (index, meeting) in meetings.iter().enumerate() {
        for field in ["id", "title", "date"] {
            let present = meeting
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty());
            if !present {
                return Err(ImportError::InvalidMeeting { index, field });
            }
        }
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_import_roundtrip() {
        let meetings = vec![Meeting::new("Weekly sync", "2026-08-07")];
        let exported = export_json(&meetings, &[], &["Team".to_string()]).unwrap();

        // 2-space indentation, stable field naming.
        assert!(exported.contains("\n  \"meetings\""));
        assert!(exported.contains("\"createdAt\""));

        let parsed = parse_import(&exported).unwrap();
        assert_eq!(parsed.meetings, meetings);
        assert_eq!(parsed.groups, Some(vec!["Team".to_string()]));
    }

    #[test]
    fn test_import_rejects_missing_date() {
        // A meeting without `date` rejects the entire file.
        let raw = r#"{"meetings": [{"id": "1", "title": "A"}], "reminders": []}"#;
        let err = parse_import(raw).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidMeeting { index: 0, field: "date" }
        ));
    }

    #[test]
    fn test_import_rejects_empty_id() {
        let raw = r#"{"meetings": [{"id": "", "title": "A", "date": "2026-08-07"}], "reminders": []}"#;
        let err = parse_import(raw).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidMeeting { index: 0, field: "id" }
        ));
    }

    #[test]
    fn test_import_rejects_non_array_collections() {
        assert!(matches!(
            parse_import(r#"{"meetings": {}, "reminders": []}"#).unwrap_err(),
            ImportError::MeetingsNotArray
        ));
        assert!(matches!(
            parse_import(r#"{"meetings": []}"#).unwrap_err(),
            ImportError::RemindersNotArray
        ));
        assert!(matches!(
            parse_import("not json at all").unwrap_err(),
            ImportError::Json(_)
        ));
    }

    #[test]
    fn test_import_tolerates_missing_optional_fields() {
        let raw = r#"{"meetings": [{"id": "1", "title": "A", "date": "2026-08-07"}], "reminders": []}"#;
        let parsed = parse_import(raw).unwrap();
        assert_eq!(parsed.meetings.len(), 1);
        assert!(parsed.meetings[0].content.is_empty());
        assert!(parsed.meetings[0].group.is_none());
        assert!(parsed.groups.is_none());
    }
}
