//! Spike API models.
//!
//! Incident payloads are loosely typed upstream: ids may be numbers or
//! strings, nested objects may be missing, notes may be plain strings.
//! Every nested field is decoded leniently so one odd field never drops
//! the whole incident.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

// ============================================================================
// Lenient decoding helpers
// ============================================================================

/// Decode `T`, falling back to `T::default()` when the value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Render a scalar JSON value as display text. Strings are unquoted, null is empty.
#[must_use]
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Read a string field from a JSON object, treating null and non-strings as absent.
fn str_field<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

// ============================================================================
// Incident
// ============================================================================

/// One incident as returned by `GET /incidents`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Incident identifier.
    #[serde(rename = "_id", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    /// Human-readable counter id (number or string upstream).
    #[serde(default)]
    pub counter_id: Option<Value>,
    /// Alert message.
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<String>,
    /// Incident status (triggered, acknowledged, resolved).
    #[serde(default)]
    pub status: Option<Value>,
    /// Incident metadata.
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Metadata,
    /// Source integration.
    #[serde(default, deserialize_with = "lenient")]
    pub integration: Integration,
    /// Assigned users.
    #[serde(default, deserialize_with = "lenient")]
    pub assignee: Vec<Value>,
    /// Creation time (UTC, ISO 8601).
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<String>,
    /// Triggered time (UTC, ISO 8601).
    #[serde(rename = "NACK_at", default, deserialize_with = "lenient")]
    pub nack_at: Option<String>,
    /// Acknowledgement time (UTC, ISO 8601).
    #[serde(rename = "ACK_at", default, deserialize_with = "lenient")]
    pub ack_at: Option<String>,
    /// Resolution time (UTC, ISO 8601).
    #[serde(rename = "RES_at", default, deserialize_with = "lenient")]
    pub res_at: Option<String>,
    /// Notes and comments attached to the grouped incident.
    #[serde(default, deserialize_with = "lenient")]
    pub grouped_incident: GroupedIncident,
}

impl Incident {
    /// Raw creation time shown in reports: the triggered time, else `createdAt`.
    #[must_use]
    pub fn created_raw(&self) -> Option<&str> {
        non_empty(self.nack_at.as_deref()).or_else(|| non_empty(self.created_at.as_deref()))
    }

    /// Emails of all assignees that have one, in order.
    #[must_use]
    pub fn assignee_emails(&self) -> Vec<&str> {
        self.assignee
            .iter()
            .filter_map(|a| str_field(a, "email"))
            .filter(|email| !email.is_empty())
            .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Incident metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    /// Priority label (`p1`, `p2`, ...).
    #[serde(default)]
    pub priority: Option<Value>,
}

/// Integration that raised the incident.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Integration {
    /// Integration name.
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

/// Grouped incident holding the activity log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupedIncident {
    /// Notes, oldest first.
    #[serde(default, deserialize_with = "lenient")]
    pub notes: Vec<Entry>,
    /// Comments, oldest first.
    #[serde(default, deserialize_with = "lenient")]
    pub comments: Vec<Entry>,
}

// ============================================================================
// Notes and comments
// ============================================================================

/// A note or comment.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Structured entry with author and timestamp.
    Structured(EntryRecord),
    /// Anything else, rendered verbatim.
    Plain(String),
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_object() {
            return Ok(match serde_json::from_value::<EntryRecord>(value.clone()) {
                Ok(record) => Self::Structured(record),
                Err(_) => Self::Plain(value.to_string()),
            });
        }
        Ok(Self::Plain(display_value(Some(&value))))
    }
}

/// Structured note/comment body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    /// When the entry was written (UTC, ISO 8601).
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<String>,
    /// Free-text body.
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    /// Author.
    #[serde(default)]
    pub user: Option<UserRef>,
}

/// Reference to the author of an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum UserRef {
    /// User embedded in the payload.
    Inline(InlineUser),
    /// Opaque user id that needs a lookup.
    Id(String),
}

impl UserRef {
    /// True when the reference carries nothing to resolve.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Inline(user) => user.is_empty(),
            Self::Id(id) => id.is_empty(),
        }
    }
}

impl<'de> Deserialize<'de> for UserRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match &value {
            Value::Object(_) => Self::Inline(InlineUser {
                first_name: str_field(&value, "firstName").map(str::to_string),
                last_name: str_field(&value, "lastName").map(str::to_string),
                email: str_field(&value, "email").map(str::to_string),
            }),
            other => Self::Id(display_value(Some(other))),
        })
    }
}

/// Name fields shared by inline users and looked-up users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineUser {
    /// First name.
    #[serde(default, deserialize_with = "lenient")]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(default, deserialize_with = "lenient")]
    pub last_name: Option<String>,
    /// Email address.
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
}

impl InlineUser {
    /// `"{first} {last}"` trimmed, else the email, else `None`.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default().trim(),
            self.last_name.as_deref().unwrap_or_default().trim()
        );
        let full = full.trim();
        if !full.is_empty() {
            return Some(full.to_string());
        }
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(str::to_string)
    }

    fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

/// User record returned by `GET /users/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    /// User identifier.
    #[serde(rename = "_id", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    /// Name and email.
    #[serde(flatten)]
    pub profile: InlineUser,
}

// ============================================================================
// Teams
// ============================================================================

/// Team as listed by `GET /teams/get-all-teams`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TeamSummary {
    /// Team name.
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    /// Team identifier, used as the `x-team-id` credential.
    #[serde(rename = "_id", default, deserialize_with = "lenient")]
    pub id: Option<String>,
}

// ============================================================================
// Response envelopes
// ============================================================================

/// Pull the incident array out of any of the envelope shapes Spike uses.
///
/// Accepts `{"incidents": [...]}`, `{"result": {"incidents": [...]}}` and a
/// bare array. Anything else yields an empty list.
#[must_use]
pub fn incident_values(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            if let Some(Value::Array(items)) = map.remove("incidents") {
                return items;
            }
            match map.remove("result") {
                Some(Value::Object(mut result)) => match result.remove("incidents") {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                },
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

/// Pull the team array out of `data`, `teams` or `result`.
#[must_use]
pub fn team_values(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => ["data", "teams", "result"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) if !items.is_empty() => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_incident_full_payload() {
        let incident: Incident = serde_json::from_value(json!({
            "_id": "65f0",
            "counterId": 42,
            "message": "CPU high",
            "status": "ACK",
            "metadata": {"priority": "p1"},
            "integration": {"name": "Grafana"},
            "assignee": [{"email": "a@x.io"}, {"name": "no email"}, {"email": ""}, "bogus"],
            "NACK_at": "2024-03-01T10:00:00Z",
            "ACK_at": "2024-03-01T10:05:00Z",
            "groupedIncident": {
                "notes": [
                    {"createdAt": "2024-03-01T10:06:00Z", "user": "u1", "content": "looking"},
                    "legacy note"
                ],
                "comments": []
            }
        }))
        .unwrap();

        assert_eq!(display_value(incident.counter_id.as_ref()), "42");
        assert_eq!(display_value(incident.metadata.priority.as_ref()), "p1");
        assert_eq!(incident.integration.name.as_deref(), Some("Grafana"));
        assert_eq!(incident.assignee_emails(), vec!["a@x.io"]);
        assert_eq!(incident.created_raw(), Some("2024-03-01T10:00:00Z"));
        assert_eq!(incident.grouped_incident.notes.len(), 2);
        assert_eq!(
            incident.grouped_incident.notes[1],
            Entry::Plain("legacy note".to_string())
        );
        match &incident.grouped_incident.notes[0] {
            Entry::Structured(record) => {
                assert_eq!(record.user, Some(UserRef::Id("u1".to_string())));
            }
            Entry::Plain(_) => panic!("expected structured note"),
        }
    }

    #[test]
    fn test_incident_malformed_nested_fields_degrade() {
        let incident: Incident = serde_json::from_value(json!({
            "counterId": "INC-7",
            "metadata": "oops",
            "integration": null,
            "assignee": {"email": "not-a-list@x.io"},
            "groupedIncident": {"notes": "nope"},
            "ACK_at": 12345
        }))
        .unwrap();

        assert_eq!(display_value(incident.counter_id.as_ref()), "INC-7");
        assert!(incident.metadata.priority.is_none());
        assert!(incident.integration.name.is_none());
        assert!(incident.assignee_emails().is_empty());
        assert!(incident.grouped_incident.notes.is_empty());
        assert!(incident.ack_at.is_none());
    }

    #[test]
    fn test_created_falls_back_to_created_at() {
        let incident: Incident = serde_json::from_value(json!({
            "createdAt": "2024-03-01T09:00:00Z",
            "NACK_at": ""
        }))
        .unwrap();
        assert_eq!(incident.created_raw(), Some("2024-03-01T09:00:00Z"));
    }

    #[test]
    fn test_user_ref_shapes() {
        let inline: UserRef =
            serde_json::from_value(json!({"firstName": "Ada", "lastName": null})).unwrap();
        assert_eq!(
            inline,
            UserRef::Inline(InlineUser {
                first_name: Some("Ada".to_string()),
                last_name: None,
                email: None,
            })
        );

        let numeric: UserRef = serde_json::from_value(json!(17)).unwrap();
        assert_eq!(numeric, UserRef::Id("17".to_string()));

        assert!(UserRef::Id(String::new()).is_empty());
        assert!(UserRef::Inline(InlineUser::default()).is_empty());
    }

    #[test]
    fn test_inline_display_name_fallbacks() {
        let both = InlineUser {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            email: Some("ada@x.io".into()),
        };
        assert_eq!(both.display_name().as_deref(), Some("Ada Lovelace"));

        let first_only = InlineUser {
            first_name: Some("Ada".into()),
            last_name: Some(String::new()),
            email: None,
        };
        assert_eq!(first_only.display_name().as_deref(), Some("Ada"));

        let email_only = InlineUser {
            first_name: Some(" ".into()),
            last_name: None,
            email: Some("ada@x.io".into()),
        };
        assert_eq!(email_only.display_name().as_deref(), Some("ada@x.io"));

        assert_eq!(InlineUser::default().display_name(), None);
    }

    #[test]
    fn test_entry_shapes() {
        let entry: Entry = serde_json::from_value(json!({"content": ["x"]})).unwrap();
        assert!(matches!(entry, Entry::Structured(_)));

        let number: Entry = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(number, Entry::Plain("3".to_string()));
    }

    #[test]
    fn test_user_record() {
        let user: User = serde_json::from_value(json!({
            "_id": "u1",
            "firstName": "Alice",
            "lastName": "",
            "email": "alice@x.io"
        }))
        .unwrap();
        assert_eq!(user.id.as_deref(), Some("u1"));
        assert_eq!(user.profile.display_name().as_deref(), Some("Alice"));
    }

    #[test]
    fn test_incident_envelopes() {
        assert_eq!(incident_values(json!({"incidents": [1, 2]})).len(), 2);
        assert_eq!(
            incident_values(json!({"result": {"incidents": [1]}})).len(),
            1
        );
        assert_eq!(incident_values(json!([1, 2, 3])).len(), 3);
        assert!(incident_values(json!({"unexpected": true})).is_empty());
    }

    #[test]
    fn test_team_envelopes() {
        assert_eq!(team_values(json!({"data": [{"name": "a"}]})).len(), 1);
        assert_eq!(team_values(json!({"data": [], "teams": [{}, {}]})).len(), 2);
        assert_eq!(team_values(json!({"result": [{}]})).len(), 1);
        assert!(team_values(json!({"other": [{}]})).is_empty());
    }
}
