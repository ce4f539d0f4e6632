//! Incident → report row flattening.
//!
//! [`flatten`] turns one incident into a [`Row`] of display strings. It never
//! fails: missing or malformed fields become empty cells or are passed
//! through verbatim.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::client::UserDirectory;
use crate::config::TeamContext;
use crate::error::SpikeError;
use crate::models::{display_value, Entry, EntryRecord, Incident};
use crate::resolver::UserResolver;
use crate::time::{parse_utc, DisplayZone};

/// Incident timestamp whose calendar date selects notes in same-day mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteDayAnchor {
    /// `ACK_at`.
    #[default]
    Acknowledged,
    /// `NACK_at`, else `createdAt`.
    Created,
}

impl NoteDayAnchor {
    fn raw<'a>(self, incident: &'a Incident) -> Option<&'a str> {
        match self {
            Self::Acknowledged => incident.ack_at.as_deref(),
            Self::Created => incident.created_raw(),
        }
    }
}

impl fmt::Display for NoteDayAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acknowledged => write!(f, "acknowledged"),
            Self::Created => write!(f, "created"),
        }
    }
}

impl FromStr for NoteDayAnchor {
    type Err = SpikeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acknowledged" | "ack" => Ok(Self::Acknowledged),
            "created" | "triggered" => Ok(Self::Created),
            other => Err(SpikeError::Config(format!(
                "unknown note anchor '{other}' (expected acknowledged or created)"
            ))),
        }
    }
}

/// Switches covering the differences between report variants.
#[derive(Debug, Clone, Copy)]
pub struct FlattenOptions {
    /// Zone for every displayed timestamp.
    pub zone: DisplayZone,
    /// Render comments (and resolve their authors).
    pub include_comments: bool,
    /// Keep only notes written on the anchor's calendar date.
    pub same_day_notes_only: bool,
    /// Anchor for `same_day_notes_only`.
    pub note_day_anchor: NoteDayAnchor,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            zone: DisplayZone::default(),
            include_comments: true,
            same_day_notes_only: false,
            note_day_anchor: NoteDayAnchor::default(),
        }
    }
}

/// One flattened incident, in report column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub team: String,
    pub counter_id: String,
    pub message: String,
    pub assignees: String,
    pub priority: String,
    pub status: String,
    pub source: String,
    pub created: String,
    pub acknowledged: String,
    pub resolved: String,
    pub notes: String,
    pub comments: String,
}

/// Flatten `incident` for `team`, resolving note and comment authors through `resolver`.
pub async fn flatten<D: UserDirectory + ?Sized>(
    incident: &Incident,
    team: &TeamContext,
    options: &FlattenOptions,
    resolver: &mut UserResolver<'_, D>,
) -> Row {
    let zone = &options.zone;
    let grouped = &incident.grouped_incident;

    let notes = if options.same_day_notes_only {
        let anchor = options
            .note_day_anchor
            .raw(incident)
            .and_then(parse_utc)
            .map(|dt| zone.local_date(dt));
        same_day_notes(&grouped.notes, anchor, team, zone, resolver).await
    } else {
        render_entries(&grouped.notes, team, zone, resolver).await
    };

    let comments = if options.include_comments {
        render_entries(&grouped.comments, team, zone, resolver).await
    } else {
        String::new()
    };

    Row {
        team: team.name.clone(),
        counter_id: display_value(incident.counter_id.as_ref()),
        message: incident.message.clone().unwrap_or_default(),
        assignees: incident.assignee_emails().join(", "),
        priority: display_value(incident.metadata.priority.as_ref()),
        status: display_value(incident.status.as_ref()),
        source: incident.integration.name.clone().unwrap_or_default(),
        created: zone.display(incident.created_raw()),
        acknowledged: zone.display(incident.ack_at.as_deref()),
        resolved: zone.display(incident.res_at.as_deref()),
        notes,
        comments,
    }
}

/// Render every entry, one line each.
async fn render_entries<D: UserDirectory + ?Sized>(
    entries: &[Entry],
    team: &TeamContext,
    zone: &DisplayZone,
    resolver: &mut UserResolver<'_, D>,
) -> String {
    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        let line = match entry {
            Entry::Plain(text) => text.clone(),
            Entry::Structured(record) => {
                let timestamp = zone.display(record.created_at.as_deref());
                render_record(record, &timestamp, team, resolver).await
            }
        };
        lines.push(line);
    }
    lines.join("\n")
}

/// Render structured notes written on `anchor`'s date. No anchor, no notes.
async fn same_day_notes<D: UserDirectory + ?Sized>(
    entries: &[Entry],
    anchor: Option<NaiveDate>,
    team: &TeamContext,
    zone: &DisplayZone,
    resolver: &mut UserResolver<'_, D>,
) -> String {
    let Some(anchor) = anchor else {
        return String::new();
    };

    let mut lines = Vec::new();
    for entry in entries {
        let Entry::Structured(record) = entry else {
            continue;
        };
        let Some(written) = record.created_at.as_deref().and_then(parse_utc) else {
            continue;
        };
        if zone.local_date(written) != anchor {
            continue;
        }
        lines.push(render_record(record, &zone.format(written), team, resolver).await);
    }
    lines.join("\n")
}

/// `"{timestamp} | {author}: {content}"`, with content folded onto one line.
async fn render_record<D: UserDirectory + ?Sized>(
    record: &EntryRecord,
    timestamp: &str,
    team: &TeamContext,
    resolver: &mut UserResolver<'_, D>,
) -> String {
    let author = resolver.resolve(record.user.as_ref(), team).await;
    let content = single_line(record.content.as_deref().unwrap_or_default());
    format!("{timestamp} | {author}: {content}")
}

/// Collapse line breaks so a multi-line body stays on one report line.
fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SpikeError};
    use crate::models::User;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Directory {
        calls: AtomicUsize,
    }

    impl Directory {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl UserDirectory for Directory {
        async fn fetch_user(&self, user_id: &str, _team: &TeamContext) -> Result<User> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match user_id {
                "u1" => Ok(serde_json::from_value(json!({"firstName": "Alice"}))?),
                "u2" => Ok(serde_json::from_value(json!({"firstName": "Bob", "lastName": "Ng"}))?),
                _ => Err(SpikeError::Api {
                    status: 404,
                    message: String::new(),
                }),
            }
        }
    }

    fn team() -> TeamContext {
        TeamContext::new("Payments", "team-p")
    }

    fn options() -> FlattenOptions {
        FlattenOptions {
            zone: "+05:30".parse().unwrap(),
            ..FlattenOptions::default()
        }
    }

    fn incident(value: serde_json::Value) -> Incident {
        serde_json::from_value(value).unwrap()
    }

    async fn run(incident: &Incident, options: &FlattenOptions) -> (Row, usize) {
        let directory = Directory::new();
        let mut resolver = UserResolver::new(&directory, Duration::ZERO);
        let row = flatten(incident, &team(), options, &mut resolver).await;
        (row, directory.calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_full_row() {
        let inc = incident(json!({
            "counterId": 101,
            "message": "Disk full",
            "status": "resolved",
            "metadata": {"priority": "p2"},
            "integration": {"name": "Prometheus"},
            "assignee": [{"email": "a@x.io"}, {"email": "b@x.io"}],
            "NACK_at": "2024-03-01T10:00:00Z",
            "ACK_at": "2024-03-01T10:02:00Z",
            "RES_at": "2024-03-01T11:00:00Z",
            "groupedIncident": {
                "notes": [{"createdAt": "2024-03-01T10:03:00Z", "user": "u1", "content": "a\nb"}],
                "comments": [{"createdAt": "2024-03-01T10:04:00Z", "user": {"firstName": "Cy", "lastName": "Po"}, "content": "ok"}]
            }
        }));

        let (row, calls) = run(&inc, &options()).await;

        assert_eq!(
            row,
            Row {
                team: "Payments".into(),
                counter_id: "101".into(),
                message: "Disk full".into(),
                assignees: "a@x.io, b@x.io".into(),
                priority: "p2".into(),
                status: "resolved".into(),
                source: "Prometheus".into(),
                created: "2024-03-01 15:30:00".into(),
                acknowledged: "2024-03-01 15:32:00".into(),
                resolved: "2024-03-01 16:30:00".into(),
                notes: "2024-03-01 15:33:00 | Alice: a b".into(),
                comments: "2024-03-01 15:34:00 | Cy Po: ok".into(),
            }
        );
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_empty_incident_degrades() {
        let (row, calls) = run(&incident(json!({})), &options()).await;

        assert_eq!(
            row,
            Row {
                team: "Payments".into(),
                ..Row::default()
            }
        );
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_unparsable_timestamps_pass_through() {
        let inc = incident(json!({
            "createdAt": "last tuesday",
            "ACK_at": "2024-13-45T99:00:00Z",
            "groupedIncident": {
                "notes": [{"createdAt": "soon", "user": "u2", "content": "hi"}]
            }
        }));

        let (row, _) = run(&inc, &options()).await;

        assert_eq!(row.created, "last tuesday");
        assert_eq!(row.acknowledged, "2024-13-45T99:00:00Z");
        assert_eq!(row.resolved, "");
        assert_eq!(row.notes, "soon | Bob Ng: hi");
    }

    #[tokio::test]
    async fn test_plain_entries_and_unknown_users() {
        let inc = incident(json!({
            "groupedIncident": {
                "notes": [
                    "escalated by phone",
                    {"createdAt": "2024-03-01T10:00:00Z", "user": "ghost", "content": "line1\r\nline2"},
                    {"content": "anonymous"}
                ]
            }
        }));

        let (row, _) = run(&inc, &options()).await;

        assert_eq!(
            row.notes,
            "escalated by phone\n2024-03-01 15:30:00 | ghost: line1 line2\n | : anonymous"
        );
    }

    #[tokio::test]
    async fn test_comments_disabled_skip_lookups() {
        let inc = incident(json!({
            "groupedIncident": {
                "comments": [{"createdAt": "2024-03-01T10:00:00Z", "user": "u1", "content": "x"}]
            }
        }));
        let opts = FlattenOptions {
            include_comments: false,
            ..options()
        };

        let (row, calls) = run(&inc, &opts).await;

        assert_eq!(row.comments, "");
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_same_day_notes_on_ack_date() {
        // 20:00Z on the 1st is already the 2nd at +05:30
        let inc = incident(json!({
            "NACK_at": "2024-03-01T17:00:00Z",
            "ACK_at": "2024-03-01T20:00:00Z",
            "groupedIncident": {
                "notes": [
                    {"createdAt": "2024-03-01T17:30:00Z", "user": "u1", "content": "first day"},
                    {"createdAt": "2024-03-01T21:00:00Z", "user": "u1", "content": "second day"},
                    {"createdAt": "garbage", "user": "u1", "content": "unparsable"},
                    "plain"
                ]
            }
        }));
        let opts = FlattenOptions {
            same_day_notes_only: true,
            ..options()
        };

        let (row, _) = run(&inc, &opts).await;
        assert_eq!(row.notes, "2024-03-02 02:30:00 | Alice: second day");

        let by_created = FlattenOptions {
            note_day_anchor: NoteDayAnchor::Created,
            ..opts
        };
        let (row, _) = run(&inc, &by_created).await;
        assert_eq!(row.notes, "2024-03-01 23:00:00 | Alice: first day");
    }

    #[tokio::test]
    async fn test_same_day_without_anchor_drops_notes() {
        let inc = incident(json!({
            "groupedIncident": {
                "notes": [{"createdAt": "2024-03-01T10:00:00Z", "user": "u1", "content": "x"}]
            }
        }));
        let opts = FlattenOptions {
            same_day_notes_only: true,
            ..options()
        };

        let (row, calls) = run(&inc, &opts).await;
        assert_eq!(row.notes, "");
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_anchor_parse() {
        assert_eq!(
            "ack".parse::<NoteDayAnchor>().unwrap(),
            NoteDayAnchor::Acknowledged
        );
        assert_eq!(
            "Created".parse::<NoteDayAnchor>().unwrap(),
            NoteDayAnchor::Created
        );
        assert_eq!(NoteDayAnchor::Created.to_string(), "created");
        assert!("resolved".parse::<NoteDayAnchor>().is_err());
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("a\nb"), "a b");
        assert_eq!(single_line("a\r\nb\rc"), "a b c");
        assert_eq!(single_line("plain"), "plain");
    }
}
